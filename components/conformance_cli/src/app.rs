//! Run orchestration for the CLI
//!
//! Builds a [`Harness`] from the configuration file and command-line
//! overrides, runs it and writes the report.

use crate::cli::{Cli, OutputFormat};
use crate::error::{CliError, CliResult};
use conformance_harness::{
    CancellationToken, Harness, HarnessConfig, Progress, Reporter, RunReport, TestRecord,
};
use std::io::Write;

/// Exit status when every test passed or was skipped
pub const EXIT_SUCCESS: i32 = 0;
/// Exit status when any test failed, crashed, timed out or was cancelled
pub const EXIT_FAILURES: i32 = 1;
/// Exit status for errors that stopped the run
pub const EXIT_FATAL: i32 = 2;

/// Run the suite described by `cli` and write its report
///
/// Cancelling `cancellation` stops the run early; tests that did not finish
/// are reported as cancelled and the partial report is still written.
pub fn run(cli: &Cli, cancellation: CancellationToken) -> CliResult<RunReport> {
    let config = match &cli.config {
        Some(path) => HarnessConfig::load(path)?,
        None => HarnessConfig::default(),
    };
    let config = cli.apply(config);
    let host = config.process_host().ok_or(CliError::NoHost)?;
    tracing::debug!(command = host.command(), "host configured");

    let harness = Harness::new(host)
        .with_capabilities(config.capabilities())
        .with_helpers(config.helpers())
        .with_timeout(config.timeout())
        .with_jobs(config.jobs())
        .with_fail_fast(config.fail_fast)
        .with_cancellation(cancellation);

    let reporter = Reporter::new().with_listener(print_progress);
    harness.run(&cli.paths, &reporter)?;
    let report = reporter.finalize();

    let rendered = render(&report, cli.format)?;
    match &cli.output {
        Some(path) => std::fs::write(path, rendered).map_err(|source| CliError::Output {
            path: path.clone(),
            source,
        })?,
        None => print!("{}", rendered),
    }
    Ok(report)
}

/// Render a report in the requested format
pub fn render(report: &RunReport, format: OutputFormat) -> CliResult<String> {
    match format {
        OutputFormat::Text => {
            let mut text = report.detailed_summary();
            if !text.ends_with('\n') {
                text.push('\n');
            }
            Ok(text)
        }
        OutputFormat::Json => {
            let mut json = report.to_json()?;
            json.push('\n');
            Ok(json)
        }
    }
}

/// Process exit status for the outcome of [`run`]
pub fn exit_code(outcome: &CliResult<RunReport>) -> i32 {
    match outcome {
        Ok(report) if report.is_success() => EXIT_SUCCESS,
        Ok(_) => EXIT_FAILURES,
        Err(_) => EXIT_FATAL,
    }
}

/// Progress line on stderr for every unsuccessful test
fn print_progress(record: &TestRecord, progress: &Progress) {
    if !record.result.is_unsuccessful() {
        return;
    }
    let mut stderr = std::io::stderr().lock();
    let _ = writeln!(
        stderr,
        "[{}/{}] {}: {}",
        progress.completed, progress.expected, record.id, record.result
    );
}
