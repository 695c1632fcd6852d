use crate::assertion::AssertionFailure;
use crate::discovery::{self, DiscoveredTest};
use crate::error::HarnessResult;
use crate::gate::{Capabilities, GateDecision};
use crate::host::Host;
use crate::prelude::HelperRegistry;
use crate::report::{Reporter, RunReport};
use crate::sandbox::{CancellationToken, Sandbox, DEFAULT_TIMEOUT};
use crate::test_file::{Flag, TestCase};
use core_types::ThrownError;
use crossbeam_channel::Receiver;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Why a test failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail")]
pub enum FailReason {
    /// An assertion inside the body failed
    Assertion(AssertionFailure),
    /// The body raised an error it was not expected to raise
    Uncaught(ThrownError),
    /// The negative expectation was not met
    Negative(AssertionFailure),
    /// `$DONE` was called with an error
    AsyncFailure(String),
}

impl fmt::Display for FailReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailReason::Assertion(failure) => write!(f, "assertion failed: {}", failure),
            FailReason::Uncaught(error) => write!(f, "uncaught {}", error),
            FailReason::Negative(failure) => write!(f, "negative test: {}", failure),
            FailReason::AsyncFailure(message) => write!(f, "async failure: {}", message),
        }
    }
}

/// Why a test was not run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail")]
pub enum SkipReason {
    /// The host lacks required features
    UnsupportedFeatures(Vec<String>),
    /// The host cannot honour required flags
    UnsupportedFlags(Vec<Flag>),
    /// A reftest directive asked for the skip
    Directive(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnsupportedFeatures(features) => {
                write!(f, "missing features: {}", features.join(", "))
            }
            SkipReason::UnsupportedFlags(flags) => {
                let names: Vec<&str> = flags.iter().map(Flag::name).collect();
                write!(f, "unsupported flags: {}", names.join(", "))
            }
            SkipReason::Directive(comment) => write!(f, "skipped: {}", comment),
        }
    }
}

/// Result of running a single test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail")]
pub enum ExecutionResult {
    /// Test passed successfully
    Pass,
    /// Test failed
    Fail(FailReason),
    /// Test was not run
    Skip(SkipReason),
    /// The host could not run the test to a recognisable end
    Crash(String),
    /// Test exceeded its time limit
    Timeout,
    /// The run was cancelled before the test finished
    Cancelled,
}

impl ExecutionResult {
    /// Check if the result is a pass
    pub fn is_pass(&self) -> bool {
        matches!(self, ExecutionResult::Pass)
    }

    /// Check if the result is a failure
    pub fn is_fail(&self) -> bool {
        matches!(self, ExecutionResult::Fail(_))
    }

    /// Check if the result is a skip
    pub fn is_skip(&self) -> bool {
        matches!(self, ExecutionResult::Skip(_))
    }

    /// Check if the result is a crash
    pub fn is_crash(&self) -> bool {
        matches!(self, ExecutionResult::Crash(_))
    }

    /// Check if the result is a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, ExecutionResult::Timeout)
    }

    /// Check if the result is a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExecutionResult::Cancelled)
    }

    /// Anything other than pass or skip
    pub fn is_unsuccessful(&self) -> bool {
        !(self.is_pass() || self.is_skip())
    }
}

impl fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionResult::Pass => write!(f, "pass"),
            ExecutionResult::Fail(reason) => write!(f, "{}", reason),
            ExecutionResult::Skip(reason) => write!(f, "{}", reason),
            ExecutionResult::Crash(reason) => write!(f, "crash: {}", reason),
            ExecutionResult::Timeout => write!(f, "timeout"),
            ExecutionResult::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A unit of work for the pool
#[derive(Debug, Clone)]
pub enum WorkItem {
    /// A test already in memory
    Case(TestCase),
    /// A test to be read from disk by the worker
    File {
        /// Report identity
        id: String,
        /// Location on disk
        path: PathBuf,
    },
}

impl WorkItem {
    /// Identity of the test
    pub fn id(&self) -> &str {
        match self {
            WorkItem::Case(case) => &case.id,
            WorkItem::File { id, .. } => id,
        }
    }
}

impl From<TestCase> for WorkItem {
    fn from(case: TestCase) -> Self {
        WorkItem::Case(case)
    }
}

impl From<DiscoveredTest> for WorkItem {
    fn from(test: DiscoveredTest) -> Self {
        WorkItem::File {
            id: test.id,
            path: test.path,
        }
    }
}

/// Conformance test runner
///
/// Gates each test against the host's capabilities, executes it in a
/// fresh sandbox and reports the result. Collections run on a pool of
/// worker threads.
pub struct Harness {
    host: Arc<dyn Host>,
    capabilities: Capabilities,
    helpers: Arc<HelperRegistry>,
    timeout: Duration,
    jobs: usize,
    fail_fast: bool,
    cancellation: CancellationToken,
}

impl Harness {
    /// Create a harness over `host` with default capabilities
    pub fn new<H: Host + 'static>(host: H) -> Self {
        Self::from_arc(Arc::new(host))
    }

    /// Create a harness over a shared host
    pub fn from_arc(host: Arc<dyn Host>) -> Self {
        Self {
            host,
            capabilities: Capabilities::new(),
            helpers: Arc::new(HelperRegistry::bundled()),
            timeout: DEFAULT_TIMEOUT,
            jobs: num_cpus::get(),
            fail_fast: false,
            cancellation: CancellationToken::new(),
        }
    }

    /// Use a custom capability registry
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Use a custom helper registry
    pub fn with_helpers(mut self, helpers: HelperRegistry) -> Self {
        self.helpers = Arc::new(helpers);
        self
    }

    /// Set the per-test timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the number of worker threads
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Cancel the run after the first failure or crash
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Share an external cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Get the capability registry
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Get the current timeout setting
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Get the number of worker threads
    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// Token that cancels this harness's runs
    pub fn cancellation(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    fn sandbox(&self, token: &CancellationToken) -> Sandbox {
        Sandbox::new(Arc::clone(&self.host), Arc::clone(&self.helpers), self.timeout)
            .with_cancellation(token.clone())
    }

    /// Run a single test
    pub fn run_test(&self, case: &TestCase) -> ExecutionResult {
        self.run_with(case, &self.cancellation)
    }

    fn run_with(&self, case: &TestCase, token: &CancellationToken) -> ExecutionResult {
        if let GateDecision::Skip(reason) = self.capabilities.check(case) {
            tracing::debug!(test = %case.id, %reason, "skipped");
            return ExecutionResult::Skip(reason);
        }
        let result = self.sandbox(token).execute(case);
        tracing::debug!(test = %case.id, %result, "finished");
        result
    }

    fn run_item(&self, item: &WorkItem, token: &CancellationToken) -> ExecutionResult {
        match item {
            WorkItem::Case(case) => self.run_with(case, token),
            WorkItem::File { id, path } => match TestCase::load(path, id.clone()) {
                Ok(case) => self.run_with(&case, token),
                Err(e) => {
                    tracing::warn!(test = %id, error = %e, "could not load test");
                    ExecutionResult::Crash(e.to_string())
                }
            },
        }
    }

    /// Run every item on the worker pool, submitting results to `reporter`
    ///
    /// Fail-fast cancels only this run; the harness token still cancels
    /// every run from outside.
    pub fn run_items(&self, items: Vec<WorkItem>, reporter: &Reporter) {
        reporter.expect(items.len());
        let run = self.cancellation.child();
        let run = &run;
        let workers = self.jobs.min(items.len()).max(1);

        let (tx, rx) = crossbeam_channel::unbounded();
        for item in items {
            // The receiver is alive until the end of this function.
            let _ = tx.send(item);
        }
        drop(tx);

        thread::scope(|scope| {
            let mut spawned = 0;
            for n in 0..workers {
                let rx = rx.clone();
                let worker = thread::Builder::new()
                    .name(format!("conformance-worker-{}", n))
                    .spawn_scoped(scope, move || self.drain(&rx, reporter, run));
                match worker {
                    Ok(_) => spawned += 1,
                    Err(e) => tracing::warn!(worker = n, error = %e, "failed to start worker"),
                }
            }
            if spawned == 0 {
                self.drain(&rx, reporter, run);
            }
        });
    }

    fn drain(&self, rx: &Receiver<WorkItem>, reporter: &Reporter, run: &CancellationToken) {
        for item in rx.iter() {
            let started = Instant::now();
            let result = if run.is_cancelled() {
                ExecutionResult::Cancelled
            } else {
                self.run_item(&item, run)
            };
            if self.fail_fast && (result.is_fail() || result.is_crash()) {
                tracing::info!(test = %item.id(), "fail-fast: cancelling remaining tests");
                run.cancel();
            }
            reporter.submit(item.id(), result, started.elapsed());
        }
    }

    /// Run in-memory test cases and produce a report
    pub fn run_cases(&self, cases: Vec<TestCase>) -> RunReport {
        let reporter = Reporter::new();
        self.run_items(cases.into_iter().map(WorkItem::from).collect(), &reporter);
        reporter.finalize()
    }

    /// Discover tests matching `patterns` and run them
    ///
    /// Results are streamed to `reporter`; the caller finalizes it.
    pub fn run<S: AsRef<str>>(&self, patterns: &[S], reporter: &Reporter) -> HarnessResult<()> {
        let tests = discovery::discover(patterns)?;
        tracing::info!(
            host = self.host.name(),
            tests = tests.len(),
            jobs = self.jobs,
            "starting run"
        );
        self.run_items(tests.into_iter().map(WorkItem::from).collect(), reporter);
        let progress = reporter.progress();
        tracing::info!(
            passed = progress.passed,
            failed = progress.failed,
            skipped = progress.skipped,
            crashed = progress.crashed,
            timed_out = progress.timed_out,
            "run finished"
        );
        Ok(())
    }

    /// Discover and run, returning the finalized report
    pub fn run_report<S: AsRef<str>>(&self, patterns: &[S]) -> HarnessResult<RunReport> {
        let reporter = Reporter::new();
        self.run(patterns, &reporter)?;
        Ok(reporter.finalize())
    }
}

impl fmt::Debug for Harness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Harness")
            .field("host", &self.host.name())
            .field("timeout", &self.timeout)
            .field("jobs", &self.jobs)
            .field("fail_fast", &self.fail_fast)
            .finish()
    }
}
