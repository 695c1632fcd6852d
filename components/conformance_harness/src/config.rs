//! Run configuration
//!
//! A run is described by a YAML file; command-line flags override it.
//!
//! ```yaml
//! host:
//!   command: node
//!   args: []
//!   module_args: []
//!   features: [Temporal]
//!   disabled_features: [Atomics]
//!   flags: []
//!   disabled_flags: [module]
//! jobs: 8
//! timeout_ms: 10000
//! includes_dir: test262/harness
//! fail_fast: false
//! ```

use crate::error::{HarnessError, HarnessResult};
use crate::gate::Capabilities;
use crate::host::ProcessHost;
use crate::prelude::HelperRegistry;
use crate::test_file::Flag;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default per-test timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Engine command and capabilities
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Engine executable; required for process runs
    pub command: Option<String>,
    /// Arguments before the test file
    pub args: Vec<String>,
    /// Extra arguments for module tests
    pub module_args: Vec<String>,
    /// Features supported on top of the defaults
    pub features: Vec<String>,
    /// Default features this engine lacks
    pub disabled_features: Vec<String>,
    /// Flags supported on top of the defaults
    pub flags: Vec<Flag>,
    /// Default flags this engine cannot honour
    pub disabled_flags: Vec<Flag>,
}

/// Complete run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// The engine under test
    pub host: HostConfig,
    /// Worker threads; defaults to the number of CPUs
    pub jobs: Option<usize>,
    /// Per-test timeout in milliseconds
    pub timeout_ms: u64,
    /// Directory holding helper modules that are not bundled
    pub includes_dir: Option<PathBuf>,
    /// Stop the run after the first failure or crash
    pub fail_fast: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            host: HostConfig::default(),
            jobs: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            includes_dir: None,
            fail_fast: false,
        }
    }
}

impl HarnessConfig {
    /// Load from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> HarnessResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| HarnessError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text).map_err(|source| HarnessError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse from YAML text; an empty document is the default configuration
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    /// Capability registry: defaults, plus enabled, minus disabled
    pub fn capabilities(&self) -> Capabilities {
        let mut capabilities = Capabilities::new();
        for feature in &self.host.features {
            capabilities.enable_feature(feature);
        }
        for feature in &self.host.disabled_features {
            capabilities.disable_feature(feature);
        }
        for flag in &self.host.flags {
            capabilities.enable_flag(flag.clone());
        }
        for flag in &self.host.disabled_flags {
            capabilities.disable_flag(flag);
        }
        capabilities
    }

    /// Per-test timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Worker count, never zero
    pub fn jobs(&self) -> usize {
        self.jobs.unwrap_or_else(num_cpus::get).max(1)
    }

    /// Helper registry for the configured includes directory
    pub fn helpers(&self) -> HelperRegistry {
        match &self.includes_dir {
            Some(dir) => HelperRegistry::with_includes_dir(dir.clone()),
            None => HelperRegistry::bundled(),
        }
    }

    /// Process host for the configured command, if there is one
    pub fn process_host(&self) -> Option<ProcessHost> {
        let command = self.host.command.as_ref()?;
        Some(
            ProcessHost::new(command.clone())
                .with_args(self.host.args.iter().cloned())
                .with_module_args(self.host.module_args.iter().cloned()),
        )
    }
}
