//! Conformance Runner CLI Library
//!
//! Argument parsing, configuration merging and report rendering for the
//! `conformance-run` binary.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod app;
pub mod cli;
pub mod error;

pub use app::{exit_code, render, run};
pub use cli::{Cli, OutputFormat};
pub use error::{CliError, CliResult};
