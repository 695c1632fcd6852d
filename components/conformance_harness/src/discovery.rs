//! Test discovery
//!
//! Turns the paths and glob patterns given on the command line into a
//! sorted, de-duplicated list of test files.

use crate::error::{HarnessError, HarnessResult};
use regex::Regex;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extensions that mark a file as a test
const TEST_EXTENSIONS: &[&str] = &["js", "mjs"];

/// Suffix of files that are imported by tests, never run on their own
const FIXTURE_SUFFIX: &str = "_FIXTURE";

/// A test file found on disk
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DiscoveredTest {
    /// Identity used in reports: the path with `/` separators
    pub id: String,
    /// Path to read the test from
    pub path: PathBuf,
}

impl DiscoveredTest {
    fn new(path: &Path) -> Self {
        Self {
            id: normalize(path),
            path: path.to_path_buf(),
        }
    }
}

/// Check whether `path` names a test file
pub fn is_test_file(path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    if !TEST_EXTENSIONS.contains(&ext) {
        return false;
    }
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|stem| !stem.ends_with(FIXTURE_SUFFIX))
        .unwrap_or(false)
}

/// Check whether `path` names a fixture imported by tests
pub fn is_fixture_file(path: &Path) -> bool {
    let has_extension = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| TEST_EXTENSIONS.contains(&ext));
    has_extension
        && path
            .file_stem()
            .and_then(|s| s.to_str())
            .is_some_and(|stem| stem.ends_with(FIXTURE_SUFFIX))
}

/// Resolve every pattern to test files
///
/// Plain paths may name a file or a directory. Patterns may use `*`, `**`
/// and `?`. Finding nothing at all is an error.
pub fn discover<S: AsRef<str>>(patterns: &[S]) -> HarnessResult<Vec<DiscoveredTest>> {
    let mut tests = Vec::new();
    for pattern in patterns {
        let pattern = pattern.as_ref();
        if is_glob(pattern) {
            discover_glob(pattern, &mut tests)?;
        } else {
            discover_path(Path::new(pattern), &mut tests)?;
        }
    }

    tests.sort();
    tests.dedup_by(|a, b| a.id == b.id);

    if tests.is_empty() {
        return Err(HarnessError::NoTests(
            patterns.iter().map(|p| p.as_ref().to_string()).collect(),
        ));
    }
    tracing::debug!(count = tests.len(), "discovered tests");
    Ok(tests)
}

fn discover_path(path: &Path, tests: &mut Vec<DiscoveredTest>) -> HarnessResult<()> {
    let metadata = std::fs::metadata(path).map_err(|source| HarnessError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if metadata.is_file() {
        if is_test_file(path) {
            tests.push(DiscoveredTest::new(path));
        }
        return Ok(());
    }
    walk(path, |_| true, tests)
}

fn discover_glob(pattern: &str, tests: &mut Vec<DiscoveredTest>) -> HarnessResult<()> {
    let regex = glob_to_regex(pattern)?;
    let base = glob_base(pattern);
    if !base.exists() {
        return Ok(());
    }
    walk(&base, |id| regex.is_match(id), tests)
}

fn walk(
    root: &Path,
    accept: impl Fn(&str) -> bool,
    tests: &mut Vec<DiscoveredTest>,
) -> HarnessResult<()> {
    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() || !is_test_file(entry.path()) {
            continue;
        }
        let test = DiscoveredTest::new(entry.path());
        if accept(&test.id) {
            tests.push(test);
        }
    }
    Ok(())
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?'])
}

/// Longest leading run of path components without glob characters
fn glob_base(pattern: &str) -> PathBuf {
    let normalized = pattern.replace('\\', "/");
    let mut base = PathBuf::new();
    for component in normalized.split('/') {
        if is_glob(component) {
            break;
        }
        if component.is_empty() && base.as_os_str().is_empty() {
            base.push("/");
            continue;
        }
        base.push(component);
    }
    if base.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        base
    }
}

/// Translate a glob into an anchored regex over `/`-separated paths
///
/// `**/` matches zero or more directories, `*` anything within one path
/// component and `?` a single character other than `/`.
pub fn glob_to_regex(pattern: &str) -> HarnessResult<Regex> {
    let normalized = pattern.replace('\\', "/");
    let normalized = normalized.strip_prefix("./").unwrap_or(&normalized);
    let mut out = String::from("^");
    let mut chars = normalized.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                if chars.peek() == Some(&'/') {
                    chars.next();
                    out.push_str("(?:.*/)?");
                } else {
                    out.push_str(".*");
                }
            }
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            c => out.push_str(&regex::escape(&c.to_string())),
        }
    }
    out.push('$');
    Regex::new(&out).map_err(|e| HarnessError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

/// `/`-separated path string without a leading `./`
fn normalize(path: &Path) -> String {
    let text = path.to_string_lossy().replace('\\', "/");
    match text.strip_prefix("./") {
        Some(rest) => rest.to_string(),
        None => text,
    }
}
