//! Line protocol between a host and the harness
//!
//! Hosts talk to the harness through their output. A handful of lines are
//! structured signals; everything else is plain text that is only looked
//! at after the host exits, to recognise an uncaught error.

use crate::assertion::AssertionFailure;
use core_types::{ErrorKind, ThrownError};
use regex::Regex;
use std::sync::LazyLock;

/// Prefix of a structured assertion failure record
pub const FAILURE_PREFIX: &str = "Test262:Failure ";

/// Printed by `$DONE()` on success
pub const ASYNC_COMPLETE: &str = "Test262:AsyncTestComplete";

/// Prefix printed by `$DONE(error)`
pub const ASYNC_FAILURE_PREFIX: &str = "Test262:AsyncTestFailure:";

/// Thrown by `$DONOTEVALUATE()`; seeing it means the body ran
pub const DO_NOT_EVALUATE: &str = "Test262: This statement should not be evaluated.";

/// `Error: msg`, `Uncaught RangeError: msg`, `file.js:3: SyntaxError: msg`
static UNCAUGHT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:Uncaught\s+)?(?:\S+:\d+(?::\d+)?:?\s+)?(?:uncaught exception:\s+)?(?P<kind>(?:[A-Z][A-Za-z0-9]*)?Error)(?::\s?(?P<message>.*?))?\s*$",
    )
    .expect("uncaught error pattern is valid")
});

/// A structured signal decoded from host output
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    /// The async test finished successfully
    AsyncComplete,
    /// The async test reported a failure
    AsyncFailure(String),
    /// An assertion failed inside the body
    Failure(AssertionFailure),
    /// The body raised an error nobody caught
    Uncaught(ThrownError),
}

/// Decode one output line, if it is a protocol line
///
/// A failure record whose JSON does not parse is left as plain text; the
/// `Test262Error` that follows it still identifies the failure.
pub fn decode_line(line: &str) -> Option<Signal> {
    let line = line.trim_end();
    if line == ASYNC_COMPLETE {
        return Some(Signal::AsyncComplete);
    }
    if let Some(message) = line.strip_prefix(ASYNC_FAILURE_PREFIX) {
        return Some(Signal::AsyncFailure(message.trim().to_string()));
    }
    if let Some(record) = line.strip_prefix(FAILURE_PREFIX) {
        match serde_json::from_str::<AssertionFailure>(record) {
            Ok(failure) => return Some(Signal::Failure(failure)),
            Err(e) => {
                tracing::debug!(error = %e, "ignoring unreadable failure record");
            }
        }
    }
    None
}

/// Render a failure as a protocol line
pub fn encode_failure(failure: &AssertionFailure) -> String {
    match serde_json::to_string(failure) {
        Ok(json) => format!("{}{}", FAILURE_PREFIX, json),
        Err(_) => format!("{}{{}}", FAILURE_PREFIX),
    }
}

/// Recognise an uncaught error in a single line
pub fn parse_uncaught(line: &str) -> Option<ThrownError> {
    let caps = UNCAUGHT.captures(line)?;
    let kind = ErrorKind::from_name(caps.name("kind")?.as_str());
    let message = caps
        .name("message")
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();
    Some(ThrownError::new(kind, message))
}

/// First uncaught error in `lines`
pub fn find_uncaught<'a, I>(lines: I) -> Option<ThrownError>
where
    I: IntoIterator<Item = &'a String>,
{
    lines.into_iter().find_map(|line| parse_uncaught(line))
}

/// Whether any line shows the `$DONOTEVALUATE` marker
pub fn was_evaluated<'a, I>(lines: I) -> bool
where
    I: IntoIterator<Item = &'a String>,
{
    lines.into_iter().any(|line| line.contains(DO_NOT_EVALUATE))
}
