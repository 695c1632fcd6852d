//! Isolated execution of one test
//!
//! The sandbox composes the program, launches it on a [`Host`], watches the
//! event stream against a wall-clock deadline and classifies what it saw
//! into exactly one [`ExecutionResult`].

use crate::assertion::AssertionFailure;
use crate::harness::{ExecutionResult, FailReason};
use crate::host::{ExitState, Host, HostEvent, Stream};
use crate::prelude::{HelperRegistry, Program};
use crate::protocol::{self, Signal};
use crate::test_file::{Phase, TestCase};
use core_types::{ErrorKind, ThrownError};
use crossbeam_channel::RecvTimeoutError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Upper bound on a single wait, so cancellation is noticed promptly
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Default per-test wall-clock limit
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Shared flag asking every sandbox to stop
///
/// A child token observes its parent, but cancelling the child leaves the
/// parent untouched.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
    parent: Option<Arc<AtomicBool>>,
}

impl CancellationToken {
    /// Token that is not cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Token cancelled by either itself or `self`
    pub fn child(&self) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            parent: Some(Arc::clone(&self.flag)),
        }
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Check if cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
            || self
                .parent
                .as_ref()
                .is_some_and(|parent| parent.load(Ordering::Acquire))
    }
}

/// Everything seen from one execution
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Observation {
    /// Plain stdout lines
    pub stdout: Vec<String>,
    /// Plain stderr lines
    pub stderr: Vec<String>,
    /// First assertion failure record
    pub failure: Option<AssertionFailure>,
    /// Uncaught error reported directly by the host
    pub uncaught: Option<ThrownError>,
    /// `Test262:AsyncTestComplete` was seen
    pub async_complete: bool,
    /// `Test262:AsyncTestFailure:<msg>` was seen
    pub async_failure: Option<String>,
    /// How the execution ended, once it has
    pub exit: Option<ExitState>,
}

impl Observation {
    /// Fold one event in
    pub fn record(&mut self, event: HostEvent) {
        match event {
            HostEvent::Line(Stream::Stdout, line) => self.stdout.push(line),
            HostEvent::Line(Stream::Stderr, line) => self.stderr.push(line),
            HostEvent::Signal(Signal::AsyncComplete) => self.async_complete = true,
            HostEvent::Signal(Signal::AsyncFailure(message)) => {
                self.async_failure.get_or_insert(message);
            }
            HostEvent::Signal(Signal::Failure(failure)) => {
                self.failure.get_or_insert(failure);
            }
            HostEvent::Signal(Signal::Uncaught(error)) => {
                self.uncaught.get_or_insert(error);
            }
            HostEvent::Exited(state) => self.exit = Some(state),
        }
    }

    /// Whether there is enough to classify
    ///
    /// Synchronous tests are settled when the host exits. Async tests need
    /// their completion signal unless the host already failed on its own.
    pub fn is_settled(&self, is_async: bool) -> bool {
        let Some(exit) = self.exit else {
            return false;
        };
        if !is_async {
            return true;
        }
        self.async_complete
            || self.async_failure.is_some()
            || self.failure.is_some()
            || self.uncaught.is_some()
            || !exit.is_success()
    }

    /// The uncaught error, from a direct report or recognised in the output
    ///
    /// Output is only searched after an unclean exit; stderr comes first.
    pub fn uncaught_error(&self) -> Option<ThrownError> {
        if let Some(error) = &self.uncaught {
            return Some(error.clone());
        }
        match self.exit {
            Some(state) if !state.is_success() => protocol::find_uncaught(&self.stderr)
                .or_else(|| protocol::find_uncaught(&self.stdout)),
            _ => None,
        }
    }

    /// Whether the body was evaluated (the `$DONOTEVALUATE` marker showed up)
    pub fn was_evaluated(&self) -> bool {
        protocol::was_evaluated(self.stderr.iter().chain(&self.stdout))
    }

    fn last_output(&self) -> Option<&str> {
        self.stderr
            .iter()
            .chain(&self.stdout)
            .rev()
            .find(|line| !line.trim().is_empty())
            .map(String::as_str)
    }
}

/// Runs single tests in fresh host state
pub struct Sandbox {
    host: Arc<dyn Host>,
    helpers: Arc<HelperRegistry>,
    timeout: Duration,
    cancellation: CancellationToken,
}

impl Sandbox {
    /// Sandbox over `host` with the given helpers and timeout
    pub fn new(host: Arc<dyn Host>, helpers: Arc<HelperRegistry>, timeout: Duration) -> Self {
        Self {
            host,
            helpers,
            timeout,
            cancellation: CancellationToken::new(),
        }
    }

    /// Observe `token` for cancellation
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// The per-test timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Execute `case` and classify the outcome
    pub fn execute(&self, case: &TestCase) -> ExecutionResult {
        if self.cancellation.is_cancelled() {
            return ExecutionResult::Cancelled;
        }

        let program = match Program::compose(case, &self.helpers) {
            Ok(program) => program,
            Err(e) => return ExecutionResult::Crash(e.to_string()),
        };

        let mut execution = match self.host.launch(&program) {
            Ok(execution) => execution,
            Err(e) => {
                tracing::warn!(test = %case.id, error = %e, "host failed to launch");
                return ExecutionResult::Crash(e.to_string());
            }
        };

        let deadline = Instant::now() + self.timeout;
        let mut observation = Observation::default();

        while !observation.is_settled(program.is_async) {
            if self.cancellation.is_cancelled() {
                execution.terminate();
                return ExecutionResult::Cancelled;
            }

            let now = Instant::now();
            if now >= deadline {
                execution.terminate();
                tracing::warn!(test = %case.id, timeout_ms = self.timeout.as_millis() as u64, "test timed out");
                return ExecutionResult::Timeout;
            }

            let wait = (deadline - now).min(POLL_INTERVAL);
            match execution.events().recv_timeout(wait) {
                Ok(event) => observation.record(event),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    if observation.exit.is_none() {
                        return ExecutionResult::Crash(
                            "host closed its event stream without exiting".to_string(),
                        );
                    }
                    thread::sleep(wait);
                }
            }
        }

        classify(case, &observation)
    }
}

/// Turn an observation into the result of `case`
pub fn classify(case: &TestCase, observation: &Observation) -> ExecutionResult {
    let negative = case.metadata.negative.as_ref();

    if let Some(failure) = &observation.failure {
        if negative.is_some_and(|n| n.kind == ErrorKind::Test262Error) {
            return ExecutionResult::Pass;
        }
        return ExecutionResult::Fail(FailReason::Assertion(failure.clone()));
    }

    if let Some(message) = &observation.async_failure {
        return ExecutionResult::Fail(FailReason::AsyncFailure(message.clone()));
    }

    match (negative, observation.uncaught_error()) {
        (Some(expected), Some(error)) => {
            if error.kind != expected.kind {
                return ExecutionResult::Fail(FailReason::Negative(
                    AssertionFailure::WrongErrorKind {
                        expected: expected.kind.to_string(),
                        actual: error.kind.to_string(),
                        message: error.message,
                    },
                ));
            }
            let early = matches!(expected.phase, Phase::Parse | Phase::Resolution);
            if early && observation.was_evaluated() {
                return not_raised(&expected.kind, "test body was evaluated");
            }
            ExecutionResult::Pass
        }
        (Some(expected), None) => match observation.exit {
            Some(ExitState::Code(0)) => not_raised(&expected.kind, "expected failure did not occur"),
            _ if observation.was_evaluated() => {
                not_raised(&expected.kind, "test body was evaluated")
            }
            state => crash(observation, state),
        },
        (None, Some(error)) => ExecutionResult::Fail(FailReason::Uncaught(error)),
        (None, None) => match observation.exit {
            Some(ExitState::Code(0)) if case.metadata.is_async() && !observation.async_complete => {
                ExecutionResult::Timeout
            }
            Some(ExitState::Code(0)) => ExecutionResult::Pass,
            state => crash(observation, state),
        },
    }
}

fn not_raised(expected: &ErrorKind, message: &str) -> ExecutionResult {
    ExecutionResult::Fail(FailReason::Negative(
        AssertionFailure::ExpectedErrorNotRaised {
            expected: expected.to_string(),
            message: message.to_string(),
        },
    ))
}

fn crash(observation: &Observation, state: Option<ExitState>) -> ExecutionResult {
    let mut reason = match state {
        Some(ExitState::Code(code)) => format!("host exited with status {}", code),
        Some(ExitState::Terminated) => "host was terminated".to_string(),
        None => "host did not exit".to_string(),
    };
    if let Some(line) = observation.last_output() {
        reason.push_str(": ");
        reason.push_str(line);
    }
    ExecutionResult::Crash(reason)
}
