//! Harness-level errors
//!
//! These are the faults that stop a whole run. Anything that goes wrong
//! inside a single test is folded into that test's
//! [`ExecutionResult`](crate::harness::ExecutionResult) instead.

use std::path::PathBuf;
use thiserror::Error;

/// Errors fatal to a run
#[derive(Debug, Error)]
pub enum HarnessError {
    /// A path given to the harness could not be read
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// Path that failed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The test tree could not be walked
    #[error("failed to walk test tree: {0}")]
    Walk(#[from] walkdir::Error),

    /// A glob pattern could not be compiled
    #[error("invalid test pattern `{pattern}`: {reason}")]
    InvalidPattern {
        /// Pattern as given
        pattern: String,
        /// Why it was rejected
        reason: String,
    },

    /// The configuration file is not valid YAML for [`HarnessConfig`](crate::config::HarnessConfig)
    #[error("invalid configuration in {}: {source}", path.display())]
    Config {
        /// Configuration file
        path: PathBuf,
        /// Parse error
        #[source]
        source: serde_yaml::Error,
    },

    /// Nothing matched the requested paths
    #[error("no tests matched {}", .0.join(", "))]
    NoTests(Vec<String>),
}

/// Result type for harness-level operations
pub type HarnessResult<T> = Result<T, HarnessError>;
