//! Error types for the CLI

use conformance_harness::HarnessError;
use std::path::PathBuf;
use thiserror::Error;

/// CLI-specific errors; all of them are fatal to the run
#[derive(Debug, Error)]
pub enum CliError {
    /// Discovery, configuration or test tree failure
    #[error(transparent)]
    Harness(#[from] HarnessError),

    /// Neither the config file nor `--host` names an engine
    #[error("no host command configured; pass --host or set host.command in the config file")]
    NoHost,

    /// The report could not be written
    #[error("failed to write report to {}: {source}", path.display())]
    Output {
        /// Destination that failed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The report could not be serialized
    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
