//! Error kinds raised by a subject under test.
//!
//! Negative tests name the constructor of the error they expect
//! (`negative.type` in the metadata header); this module gives those names
//! a closed type with an escape hatch for host-specific constructors.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of error raised by the subject under test.
///
/// These correspond to the built-in error constructors plus the harness's
/// own `Test262Error`, which assertion helpers throw on failure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ErrorKind {
    /// Syntax error (early errors, parse failures)
    SyntaxError,
    /// Type error (e.g., calling a non-function)
    TypeError,
    /// Reference to an unresolvable binding
    ReferenceError,
    /// Value out of allowed range
    RangeError,
    /// Error in eval() function
    EvalError,
    /// Error in URI handling functions
    URIError,
    /// Several errors wrapped together
    AggregateError,
    /// Assertion failure raised by the harness helpers
    Test262Error,
    /// Any other constructor name reported by a host
    Other(String),
}

impl ErrorKind {
    /// Resolve a constructor name such as `"RangeError"`.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_types::ErrorKind;
    ///
    /// assert_eq!(ErrorKind::from_name("RangeError"), ErrorKind::RangeError);
    /// assert_eq!(
    ///     ErrorKind::from_name("InternalError"),
    ///     ErrorKind::Other("InternalError".to_string())
    /// );
    /// ```
    pub fn from_name(name: &str) -> Self {
        match name.trim() {
            "SyntaxError" => ErrorKind::SyntaxError,
            "TypeError" => ErrorKind::TypeError,
            "ReferenceError" => ErrorKind::ReferenceError,
            "RangeError" => ErrorKind::RangeError,
            "EvalError" => ErrorKind::EvalError,
            "URIError" => ErrorKind::URIError,
            "AggregateError" => ErrorKind::AggregateError,
            "Test262Error" => ErrorKind::Test262Error,
            other => ErrorKind::Other(other.to_string()),
        }
    }

    /// The constructor name of this kind.
    pub fn name(&self) -> &str {
        match self {
            ErrorKind::SyntaxError => "SyntaxError",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::ReferenceError => "ReferenceError",
            ErrorKind::RangeError => "RangeError",
            ErrorKind::EvalError => "EvalError",
            ErrorKind::URIError => "URIError",
            ErrorKind::AggregateError => "AggregateError",
            ErrorKind::Test262Error => "Test262Error",
            ErrorKind::Other(name) => name,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<String> for ErrorKind {
    fn from(name: String) -> Self {
        ErrorKind::from_name(&name)
    }
}

impl From<&str> for ErrorKind {
    fn from(name: &str) -> Self {
        ErrorKind::from_name(name)
    }
}

impl From<ErrorKind> for String {
    fn from(kind: ErrorKind) -> Self {
        kind.name().to_string()
    }
}

/// An error raised by the subject under test.
///
/// # Examples
///
/// ```
/// use core_types::{ErrorKind, ThrownError};
///
/// let error = ThrownError::new(ErrorKind::TypeError, "undefined is not a function");
/// assert_eq!(error.kind, ErrorKind::TypeError);
/// assert_eq!(error.message, "undefined is not a function");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrownError {
    /// The constructor of the error
    pub kind: ErrorKind,
    /// Human-readable error message
    pub message: String,
}

impl ThrownError {
    /// Create an error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ThrownError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

impl std::error::Error for ThrownError {}
