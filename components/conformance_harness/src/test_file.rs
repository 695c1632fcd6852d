use core_types::ErrorKind;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

/// Header block between `/*---` and `---*/`
static FRONTMATTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)/\*---[ \t]*\r?\n(.*?)\r?\n?[ \t]*---\*/").expect("frontmatter pattern is valid")
});

/// Header block plus trailing whitespace, for stripping
static FRONTMATTER_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)/\*---.*?---\*/\s*").expect("frontmatter block pattern is valid")
});

/// Marker that opens a SpiderMonkey reftest directive line
const REFTEST_MARKER: &str = "|reftest|";

/// Metadata could not be read from a test header
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataError {
    /// A header block exists but its fields do not parse
    #[error("malformed metadata: {0}")]
    Malformed(String),
}

/// A test file could not be loaded
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file could not be read
    #[error("failed to read test file: {0}")]
    Io(#[from] std::io::Error),
    /// The header is malformed
    #[error(transparent)]
    Metadata(#[from] MetadataError),
}

/// Phase in which a negative test expects its error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Early error, raised before any evaluation
    #[serde(alias = "early")]
    Parse,
    /// Module linking error
    Resolution,
    /// Error raised during evaluation
    Runtime,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Parse => write!(f, "parse"),
            Phase::Resolution => write!(f, "resolution"),
            Phase::Runtime => write!(f, "runtime"),
        }
    }
}

/// Negative test expectation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NegativeExpectation {
    /// Phase where the error is expected
    pub phase: Phase,
    /// Error constructor expected (e.g., "SyntaxError", "RangeError")
    #[serde(rename = "type")]
    pub kind: ErrorKind,
}

/// Execution flag from the `flags` header field
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Flag {
    /// Run only in strict mode
    OnlyStrict,
    /// Run only in sloppy mode
    NoStrict,
    /// Source is an ES module
    Module,
    /// Run the source untouched, without helpers
    Raw,
    /// Completion is signalled through `$DONE`
    Async,
    /// Test was generated from a template
    Generated,
    /// Host agents cannot block
    CanBlockIsFalse,
    /// Host agents can block
    CanBlockIsTrue,
    /// Outcome depends on scheduling
    NonDeterministic,
    /// A flag this harness does not know
    Other(String),
}

impl Flag {
    /// The flag as written in a header.
    pub fn name(&self) -> &str {
        match self {
            Flag::OnlyStrict => "onlyStrict",
            Flag::NoStrict => "noStrict",
            Flag::Module => "module",
            Flag::Raw => "raw",
            Flag::Async => "async",
            Flag::Generated => "generated",
            Flag::CanBlockIsFalse => "CanBlockIsFalse",
            Flag::CanBlockIsTrue => "CanBlockIsTrue",
            Flag::NonDeterministic => "non-deterministic",
            Flag::Other(name) => name,
        }
    }
}

impl From<String> for Flag {
    fn from(name: String) -> Self {
        Flag::from(name.as_str())
    }
}

impl From<&str> for Flag {
    fn from(name: &str) -> Self {
        match name.trim() {
            "onlyStrict" => Flag::OnlyStrict,
            "noStrict" => Flag::NoStrict,
            "module" => Flag::Module,
            "raw" => Flag::Raw,
            "async" => Flag::Async,
            "generated" => Flag::Generated,
            "CanBlockIsFalse" => Flag::CanBlockIsFalse,
            "CanBlockIsTrue" => Flag::CanBlockIsTrue,
            "non-deterministic" => Flag::NonDeterministic,
            other => Flag::Other(other.to_string()),
        }
    }
}

impl From<Flag> for String {
    fn from(flag: Flag) -> Self {
        flag.name().to_string()
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Accept any YAML scalar as a string (`es6id: 19.1` is a float to YAML)
fn scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_yaml::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_yaml::Value::Null) => None,
        Some(serde_yaml::Value::String(s)) => Some(s),
        Some(serde_yaml::Value::Number(n)) => Some(n.to_string()),
        Some(serde_yaml::Value::Bool(b)) => Some(b.to_string()),
        Some(other) => {
            return Err(serde::de::Error::custom(format!(
                "expected a scalar, found {:?}",
                other
            )))
        }
    })
}

/// Test metadata parsed from the YAML header
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct TestMetadata {
    /// Human-readable description of what the test verifies
    pub description: String,
    /// Additional information about the test
    pub info: Option<String>,
    /// Expected error for negative tests
    pub negative: Option<NegativeExpectation>,
    /// Helper modules that must be loaded before the test, in order
    pub includes: Vec<String>,
    /// Execution flags
    pub flags: BTreeSet<Flag>,
    /// Capabilities required by this test
    pub features: Vec<String>,
    /// ES5.1 section identifier
    #[serde(deserialize_with = "scalar_string")]
    pub es5id: Option<String>,
    /// ES6 section identifier
    #[serde(deserialize_with = "scalar_string")]
    pub es6id: Option<String>,
    /// ES section identifier
    #[serde(deserialize_with = "scalar_string")]
    pub esid: Option<String>,
    /// Author of the test
    pub author: Option<String>,
}

impl TestMetadata {
    /// Parse the YAML header from test file source
    ///
    /// Files without a header yield the default (empty) metadata. A header
    /// that is present but does not parse is [`MetadataError::Malformed`].
    pub fn parse(source: &str) -> Result<Self, MetadataError> {
        let yaml = match FRONTMATTER.captures(source).and_then(|c| c.get(1)) {
            Some(m) => m.as_str(),
            None => return Ok(Self::default()),
        };

        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(yaml).map_err(|e| MetadataError::Malformed(e.to_string()))
    }

    /// Features from `features` that `supported` does not contain
    pub fn unsupported_features<'a>(
        &'a self,
        supported: impl Fn(&str) -> bool,
    ) -> Vec<&'a str> {
        self.features
            .iter()
            .map(String::as_str)
            .filter(|f| !supported(f))
            .collect()
    }

    /// Check if test expects a parse-phase error
    pub fn expects_parse_error(&self) -> bool {
        self.negative_phase() == Some(Phase::Parse)
    }

    /// Check if test expects a runtime-phase error
    pub fn expects_runtime_error(&self) -> bool {
        self.negative_phase() == Some(Phase::Runtime)
    }

    /// Check if test expects a resolution-phase error (ES modules)
    pub fn expects_resolution_error(&self) -> bool {
        self.negative_phase() == Some(Phase::Resolution)
    }

    fn negative_phase(&self) -> Option<Phase> {
        self.negative.as_ref().map(|n| n.phase)
    }

    /// Get the expected error kind for negative tests
    pub fn expected_error_kind(&self) -> Option<&ErrorKind> {
        self.negative.as_ref().map(|n| &n.kind)
    }

    /// Check for a flag
    pub fn has_flag(&self, flag: &Flag) -> bool {
        self.flags.contains(flag)
    }

    /// Check if test requires strict mode only
    pub fn is_strict_only(&self) -> bool {
        self.has_flag(&Flag::OnlyStrict)
    }

    /// Check if test requires non-strict mode only
    pub fn is_no_strict(&self) -> bool {
        self.has_flag(&Flag::NoStrict)
    }

    /// Check if test is an ES module test
    pub fn is_module(&self) -> bool {
        self.has_flag(&Flag::Module)
    }

    /// Check if test is asynchronous
    pub fn is_async(&self) -> bool {
        self.has_flag(&Flag::Async)
    }

    /// Check if test should run untouched (no helpers, no strict prologue)
    pub fn is_raw(&self) -> bool {
        self.has_flag(&Flag::Raw)
    }
}

/// SpiderMonkey reftest directives from a `// |reftest| ...` first line
///
/// Only the terms the harness acts on are kept; anything else lands in
/// `other` untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReftestDirectives {
    /// Unconditional `skip`
    pub skip: bool,
    /// Conditions of `skip-if(...)`, recorded but not evaluated
    pub skip_if: Vec<String>,
    /// Arguments from `shell-option(...)`, passed to the host
    pub shell_options: Vec<String>,
    /// Unrecognised terms
    pub other: Vec<String>,
    /// Text after ` -- `
    pub comment: Option<String>,
}

impl ReftestDirectives {
    /// Parse the directive line, if the first line of `source` carries one
    pub fn parse(source: &str) -> Self {
        let first = source.lines().next().unwrap_or("").trim();
        let body = match first
            .strip_prefix("//")
            .map(str::trim_start)
            .and_then(|rest| rest.strip_prefix(REFTEST_MARKER))
        {
            Some(body) => body,
            None => return Self::default(),
        };

        let (terms, comment) = match body.split_once(" -- ") {
            Some((terms, comment)) => (terms, Some(comment.trim().to_string())),
            None => (body, None),
        };

        let mut directives = Self {
            comment,
            ..Self::default()
        };
        for term in split_terms(terms) {
            if term == "skip" {
                directives.skip = true;
            } else if let Some(cond) = call_argument(&term, "skip-if") {
                directives.skip_if.push(cond.to_string());
            } else if let Some(opt) = call_argument(&term, "shell-option") {
                directives.shell_options.push(opt.to_string());
            } else {
                directives.other.push(term);
            }
        }
        directives
    }

    /// Whether the line was present at all
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Split on whitespace outside parentheses
fn split_terms(terms: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    for c in terms.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            c if c.is_whitespace() && depth == 0 => {
                if !current.is_empty() {
                    out.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// `name(arg)` -> `arg`
fn call_argument<'a>(term: &'a str, name: &str) -> Option<&'a str> {
    term.strip_prefix(name)?
        .strip_prefix('(')?
        .strip_suffix(')')
}

/// One conformance test with source and parsed metadata
#[derive(Debug, Clone)]
pub struct TestCase {
    /// Identity used in reports
    pub id: String,
    /// Location on disk, if the test came from a file
    pub path: Option<PathBuf>,
    /// Source code of the test
    pub source: String,
    /// Parsed metadata from the YAML header
    pub metadata: TestMetadata,
    /// Parsed reftest directives
    pub directives: ReftestDirectives,
}

impl TestCase {
    /// Build a test case from in-memory source
    pub fn from_source(
        id: impl Into<String>,
        source: impl Into<String>,
    ) -> Result<Self, MetadataError> {
        let source = source.into();
        let metadata = TestMetadata::parse(&source)?;
        let directives = ReftestDirectives::parse(&source);
        Ok(Self {
            id: id.into(),
            path: None,
            source,
            metadata,
            directives,
        })
    }

    /// Load a test file from disk
    pub fn load<P: AsRef<Path>>(path: P, id: impl Into<String>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        let mut case = Self::from_source(id, source)?;
        case.path = Some(path.to_path_buf());
        Ok(case)
    }

    /// Get the test name (file name without extension)
    pub fn name(&self) -> &str {
        let id = self.id.rsplit('/').next().unwrap_or(&self.id);
        id.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(id)
    }

    /// Get the test code (source without the header block)
    pub fn code(&self) -> String {
        FRONTMATTER_BLOCK.replace(&self.source, "").to_string()
    }
}
