//! Command-line arguments

use clap::{ArgAction, Parser, ValueEnum};
use conformance_harness::{Flag, HarnessConfig};
use std::path::PathBuf;

/// Report format written at the end of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary with failure details
    #[default]
    Text,
    /// Full `RunReport` as JSON
    Json,
}

/// Run test262-style conformance tests against a JavaScript engine
#[derive(Debug, Parser)]
#[command(name = "conformance-run")]
#[command(version, about = "Run test262-style conformance tests against a JavaScript engine", long_about = None)]
pub struct Cli {
    /// Test files, directories or glob patterns (`*`, `**`, `?`)
    #[arg(value_name = "PATHS", required = true)]
    pub paths: Vec<String>,

    /// YAML run configuration; flags below override it
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Engine executable
    #[arg(long, value_name = "CMD")]
    pub host: Option<String>,

    /// Argument passed to the engine before the test file
    #[arg(long = "host-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub host_args: Vec<String>,

    /// Extra engine argument for module tests
    #[arg(long = "module-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub module_args: Vec<String>,

    /// Worker threads (default: number of CPUs)
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Per-test timeout in milliseconds
    #[arg(long, value_name = "MS")]
    pub timeout: Option<u64>,

    /// Directory with helper modules that are not bundled
    #[arg(long = "includes-dir", value_name = "DIR")]
    pub includes_dir: Option<PathBuf>,

    /// Feature the engine supports on top of the defaults
    #[arg(long = "feature", value_name = "NAME")]
    pub features: Vec<String>,

    /// Default feature the engine lacks
    #[arg(long = "disable-feature", value_name = "NAME")]
    pub disabled_features: Vec<String>,

    /// Flag the engine supports on top of the defaults
    #[arg(long = "flag", value_name = "NAME")]
    pub flags: Vec<String>,

    /// Default flag the engine cannot honour
    #[arg(long = "disable-flag", value_name = "NAME")]
    pub disabled_flags: Vec<String>,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Write the report here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Stop after the first failure or crash
    #[arg(long)]
    pub fail_fast: bool,

    /// Verbose output (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Layer the command-line overrides on top of `config`
    pub fn apply(&self, mut config: HarnessConfig) -> HarnessConfig {
        if let Some(host) = &self.host {
            config.host.command = Some(host.clone());
        }
        config.host.args.extend(self.host_args.iter().cloned());
        config.host.module_args.extend(self.module_args.iter().cloned());
        config.host.features.extend(self.features.iter().cloned());
        config
            .host
            .disabled_features
            .extend(self.disabled_features.iter().cloned());
        config
            .host
            .flags
            .extend(self.flags.iter().map(|f| Flag::from(f.as_str())));
        config
            .host
            .disabled_flags
            .extend(self.disabled_flags.iter().map(|f| Flag::from(f.as_str())));
        if self.jobs.is_some() {
            config.jobs = self.jobs;
        }
        if let Some(timeout) = self.timeout {
            config.timeout_ms = timeout;
        }
        if let Some(dir) = &self.includes_dir {
            config.includes_dir = Some(dir.clone());
        }
        config.fail_fast |= self.fail_fast;
        config
    }

    /// Default log filter for the `-v` count
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
