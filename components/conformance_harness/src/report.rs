use crate::harness::ExecutionResult;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Outcome of one test in a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRecord {
    /// Test identity
    pub id: String,
    /// Classified result
    pub result: ExecutionResult,
    /// Wall-clock time spent on the test
    pub duration_ms: u64,
}

/// Running counts while a run is in progress
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Tests expected in this run, when known
    pub expected: usize,
    /// Tests reported so far
    pub completed: usize,
    /// Passed so far
    pub passed: usize,
    /// Failed so far
    pub failed: usize,
    /// Skipped so far
    pub skipped: usize,
    /// Crashed so far
    pub crashed: usize,
    /// Timed out so far
    pub timed_out: usize,
    /// Cancelled so far
    pub cancelled: usize,
}

impl Progress {
    fn count(&mut self, result: &ExecutionResult) {
        self.completed += 1;
        match result {
            ExecutionResult::Pass => self.passed += 1,
            ExecutionResult::Fail(_) => self.failed += 1,
            ExecutionResult::Skip(_) => self.skipped += 1,
            ExecutionResult::Crash(_) => self.crashed += 1,
            ExecutionResult::Timeout => self.timed_out += 1,
            ExecutionResult::Cancelled => self.cancelled += 1,
        }
    }
}

/// Test run report with statistics and per-test records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Total number of tests reported
    pub total: usize,
    /// Number of tests that passed
    pub passed: usize,
    /// Number of tests that failed
    pub failed: usize,
    /// Number of tests that were skipped
    pub skipped: usize,
    /// Number of tests whose host crashed
    pub crashed: usize,
    /// Number of tests that timed out
    pub timed_out: usize,
    /// Number of tests cancelled before finishing
    pub cancelled: usize,
    /// Wall-clock duration of the run
    pub duration_ms: u64,
    /// Every record, in order of completion
    pub records: Vec<TestRecord>,
}

impl RunReport {
    /// Build a report from records, in the given order
    pub fn from_records(records: Vec<TestRecord>, duration: Duration) -> Self {
        let mut progress = Progress::default();
        for record in &records {
            progress.count(&record.result);
        }
        Self {
            total: progress.completed,
            passed: progress.passed,
            failed: progress.failed,
            skipped: progress.skipped,
            crashed: progress.crashed,
            timed_out: progress.timed_out,
            cancelled: progress.cancelled,
            duration_ms: duration.as_millis() as u64,
            records,
        }
    }

    /// Calculate the pass rate as a percentage
    pub fn pass_rate(&self) -> f64 {
        percent(self.passed, self.total)
    }

    /// Calculate the effective pass rate (excluding skips)
    pub fn effective_pass_rate(&self) -> f64 {
        percent(self.passed, self.total - self.skipped)
    }

    /// Get failure rate as percentage
    pub fn failure_rate(&self) -> f64 {
        percent(self.failed, self.total)
    }

    /// Get skip rate as percentage
    pub fn skip_rate(&self) -> f64 {
        percent(self.skipped, self.total)
    }

    /// Check if every test passed or was skipped
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.crashed == 0 && self.timed_out == 0 && self.cancelled == 0
    }

    /// Records that count against success, in order
    pub fn failures(&self) -> impl Iterator<Item = &TestRecord> {
        self.records
            .iter()
            .filter(|record| record.result.is_unsuccessful())
    }

    /// Get the first N failures
    pub fn top_failures(&self, n: usize) -> Vec<&TestRecord> {
        self.failures().take(n).collect()
    }

    /// Look up the record of a test
    pub fn record(&self, id: &str) -> Option<&TestRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    /// Generate a human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "Conformance Results:\n\
             Total: {}\n\
             Passed: {} ({:.1}%)\n\
             Failed: {}\n\
             Skipped: {}\n\
             Crashed: {}\n\
             Timeout: {}\n\
             Cancelled: {}\n\
             Effective Pass Rate: {:.1}%\n\
             Duration: {:.2}s",
            self.total,
            self.passed,
            self.pass_rate(),
            self.failed,
            self.skipped,
            self.crashed,
            self.timed_out,
            self.cancelled,
            self.effective_pass_rate(),
            self.duration_ms as f64 / 1000.0
        )
    }

    /// Generate a detailed report including failures
    pub fn detailed_summary(&self) -> String {
        let mut output = self.summary();

        let failures: Vec<&TestRecord> = self.failures().collect();
        if !failures.is_empty() {
            output.push_str("\n\nFailures:\n");
            for record in failures {
                output.push_str(&format!("  - {}\n    Reason: {}\n", record.id, record.result));
            }
        }

        output
    }

    /// Export report as JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Import report from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        (part as f64 / whole as f64) * 100.0
    }
}

type Listener = Box<dyn Fn(&TestRecord, &Progress) + Send + Sync>;

struct ReporterState {
    records: Vec<TestRecord>,
    progress: Progress,
}

/// Collects results from concurrent workers
///
/// Submissions are serialized, so records keep the order in which tests
/// finished. An optional listener sees every record as it arrives.
pub struct Reporter {
    state: Mutex<ReporterState>,
    listener: Option<Listener>,
    started: Instant,
}

impl Reporter {
    /// Create a new reporter
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ReporterState {
                records: Vec::new(),
                progress: Progress::default(),
            }),
            listener: None,
            started: Instant::now(),
        }
    }

    /// Call `listener` after every submission
    pub fn with_listener<F>(mut self, listener: F) -> Self
    where
        F: Fn(&TestRecord, &Progress) + Send + Sync + 'static,
    {
        self.listener = Some(Box::new(listener));
        self
    }

    /// Announce how many tests the run will report
    pub fn expect(&self, count: usize) {
        self.state.lock().progress.expected = count;
    }

    /// Record the result of one test
    pub fn submit(&self, id: impl Into<String>, result: ExecutionResult, duration: Duration) {
        let record = TestRecord {
            id: id.into(),
            result,
            duration_ms: duration.as_millis() as u64,
        };
        let mut state = self.state.lock();
        state.progress.count(&record.result);
        if let Some(listener) = &self.listener {
            listener(&record, &state.progress);
        }
        state.records.push(record);
    }

    /// Snapshot of the running counts
    pub fn progress(&self) -> Progress {
        self.state.lock().progress
    }

    /// Close the run and produce the final report
    pub fn finalize(self) -> RunReport {
        let duration = self.started.elapsed();
        let state = self.state.into_inner();
        RunReport::from_records(state.records, duration)
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reporter")
            .field("progress", &self.progress())
            .field("listener", &self.listener.is_some())
            .finish()
    }
}
