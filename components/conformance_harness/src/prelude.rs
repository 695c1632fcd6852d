//! Helper modules and program composition
//!
//! Tests name helper modules in `includes`; the harness resolves them by
//! name before launch and concatenates them in front of the test body.
//! The core helpers ship with the crate so that failures come back as
//! structured records. Everything else is read from the configured
//! includes directory (usually `test262/harness`) first, with the bundled
//! copies as a fallback when no directory is configured or it lacks them.

use crate::test_file::TestCase;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Helpers prepended to every non-raw test, in order
pub const DEFAULT_INCLUDES: &[&str] = &["assert.js", "sta.js", "shell.js"];

/// Helper prepended to tests flagged `async`
pub const ASYNC_INCLUDE: &str = "doneprintHandle.js";

/// Prologue for `onlyStrict` tests
pub const STRICT_PROLOGUE: &str = "\"use strict\";\n";

const BUNDLED: &[(&str, &str)] = &[
    ("assert.js", include_str!("../harness/assert.js")),
    ("sta.js", include_str!("../harness/sta.js")),
    ("shell.js", include_str!("../harness/shell.js")),
    ("doneprintHandle.js", include_str!("../harness/doneprintHandle.js")),
    ("propertyHelper.js", include_str!("../harness/propertyHelper.js")),
    ("compareArray.js", include_str!("../harness/compareArray.js")),
];

/// A helper module could not be made available
#[derive(Debug, Error)]
pub enum HelperError {
    /// No bundled helper and nothing in the includes directory
    #[error("helper module `{0}` not found")]
    Unresolved(String),
    /// The name tries to leave the includes directory
    #[error("invalid helper module name `{0}`")]
    InvalidName(String),
    /// The helper exists but could not be read
    #[error("failed to read helper module `{name}`: {source}")]
    Io {
        /// Helper name
        name: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Resolves helper modules by name
///
/// The core helpers (the default includes and the async helper) always
/// come from the bundle, since they carry the failure protocol. Any other
/// helper comes from the includes directory when it has one. File contents
/// are cached after the first read; the cache only ever holds helper text,
/// never state produced by a test.
#[derive(Debug, Default)]
pub struct HelperRegistry {
    includes_dir: Option<PathBuf>,
    cache: RwLock<HashMap<String, Arc<str>>>,
}

impl HelperRegistry {
    /// Registry with the bundled helpers only
    pub fn bundled() -> Self {
        Self::default()
    }

    /// Registry that falls back to `dir` for helpers not bundled
    pub fn with_includes_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            includes_dir: Some(dir.into()),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// The configured includes directory
    pub fn includes_dir(&self) -> Option<&Path> {
        self.includes_dir.as_deref()
    }

    /// Names of the helpers shipped with the crate
    pub fn bundled_names() -> impl Iterator<Item = &'static str> {
        BUNDLED.iter().map(|(name, _)| *name)
    }

    /// Check whether `name` is a core helper that always comes from the bundle
    pub fn is_core(name: &str) -> bool {
        DEFAULT_INCLUDES.contains(&name) || name == ASYNC_INCLUDE
    }

    /// Resolve a helper module by name
    pub fn resolve(&self, name: &str) -> Result<Arc<str>, HelperError> {
        if Self::is_core(name) {
            if let Some(text) = bundled(name) {
                return Ok(text);
            }
        }

        if name.is_empty() || name.contains("..") || Path::new(name).is_absolute() {
            return Err(HelperError::InvalidName(name.to_string()));
        }

        if let Some(text) = self.cache.read().get(name) {
            return Ok(Arc::clone(text));
        }

        match self.read_from_dir(name)? {
            Some(text) => Ok(text),
            None => bundled(name).ok_or_else(|| HelperError::Unresolved(name.to_string())),
        }
    }

    fn read_from_dir(&self, name: &str) -> Result<Option<Arc<str>>, HelperError> {
        let Some(dir) = &self.includes_dir else {
            return Ok(None);
        };
        let path = dir.join(name);
        let text: Arc<str> = match std::fs::read_to_string(&path) {
            Ok(text) => Arc::from(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(HelperError::Io {
                    name: name.to_string(),
                    source,
                })
            }
        };

        tracing::debug!(helper = name, path = %path.display(), "loaded helper module");
        self.cache
            .write()
            .insert(name.to_string(), Arc::clone(&text));
        Ok(Some(text))
    }
}

fn bundled(name: &str) -> Option<Arc<str>> {
    BUNDLED
        .iter()
        .find(|(bundled, _)| *bundled == name)
        .map(|(_, text)| Arc::from(*text))
}

/// A test ready to hand to a host
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// Identity of the test
    pub test_id: String,
    /// Full source: prologue, helpers, then the test
    pub source: String,
    /// Helpers that were concatenated, in order
    pub includes: Vec<String>,
    /// Source must be loaded as a module
    pub module: bool,
    /// Test waits for an explicit completion signal
    pub is_async: bool,
    /// Source starts with a strict-mode prologue
    pub strict: bool,
    /// Extra host arguments requested by the test
    pub host_args: Vec<String>,
    /// Directory the test was loaded from; its fixtures travel with the program
    pub origin: Option<PathBuf>,
}

impl Program {
    /// Compose the program for `case`, resolving every helper it needs
    pub fn compose(case: &TestCase, helpers: &HelperRegistry) -> Result<Self, HelperError> {
        let metadata = &case.metadata;
        let mut program = Self {
            test_id: case.id.clone(),
            source: String::new(),
            includes: Vec::new(),
            module: metadata.is_module(),
            is_async: metadata.is_async(),
            strict: false,
            host_args: case.directives.shell_options.clone(),
            origin: case
                .path
                .as_deref()
                .and_then(Path::parent)
                .map(Path::to_path_buf),
        };

        if metadata.is_raw() {
            program.source = case.source.clone();
            return Ok(program);
        }

        if metadata.is_strict_only() && !program.module {
            program.source.push_str(STRICT_PROLOGUE);
            program.strict = true;
        }

        let mut names: Vec<&str> = DEFAULT_INCLUDES.to_vec();
        if program.is_async {
            names.push(ASYNC_INCLUDE);
        }
        for include in &metadata.includes {
            if !names.contains(&include.as_str()) {
                names.push(include);
            }
        }

        for name in names {
            let text = helpers.resolve(name)?;
            program.source.push_str(&text);
            if !text.ends_with('\n') {
                program.source.push('\n');
            }
            program.includes.push(name.to_string());
        }

        program.source.push_str(&case.source);
        Ok(program)
    }
}
