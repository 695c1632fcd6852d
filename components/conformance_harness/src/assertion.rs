//! Assertion library
//!
//! A closed set of typed assertions. Every failure is an
//! [`AssertionFailure`]; native bodies return it with `?`, which ends the
//! body on the spot. The bundled JS helpers print the same records (see
//! [`protocol`](crate::protocol)), so both hosts report identical failures.

use crate::realm::Realm;
use core_types::{ErrorKind, ObjectId, PropertyDescriptor, ThrownError, Value};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// `"msg: "` or nothing
fn prefix(message: &str) -> String {
    if message.is_empty() {
        String::new()
    } else {
        format!("{}: ", message)
    }
}

/// A failed assertion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "kind")]
pub enum AssertionFailure {
    /// Two values differ
    #[error("{}expected {expected} but got {actual}", prefix(.message))]
    AssertionFailed {
        /// Expected value, rendered
        expected: String,
        /// Actual value, rendered
        actual: String,
        /// Message supplied by the test
        #[serde(default)]
        message: String,
    },

    /// An operation was expected to raise but completed normally
    #[error("{}expected {expected} to be raised but no error occurred", prefix(.message))]
    ExpectedErrorNotRaised {
        /// Expected error kind
        expected: String,
        /// Message supplied by the test
        #[serde(default)]
        message: String,
    },

    /// An operation raised the wrong kind of error
    #[error("{}expected {expected} but {actual} was raised", prefix(.message))]
    WrongErrorKind {
        /// Expected error kind
        expected: String,
        /// Error kind actually raised
        actual: String,
        /// Message supplied by the test
        #[serde(default)]
        message: String,
    },

    /// A property attribute does not have the expected value
    #[error("property {attribute}: expected {field} to be {expected} but it is {actual}")]
    PropertyDescriptorMismatch {
        /// Property name
        attribute: String,
        /// Descriptor field (`value`, `writable`, `enumerable`, `configurable`, `present`)
        field: String,
        /// Expected field value, rendered
        expected: String,
        /// Actual field value, rendered
        actual: String,
    },
}

/// Result of one assertion
pub type AssertResult = Result<(), AssertionFailure>;

/// `assert(condition, message)`
pub fn ensure(condition: bool, message: &str) -> AssertResult {
    if condition {
        return Ok(());
    }
    Err(AssertionFailure::AssertionFailed {
        expected: "true".to_string(),
        actual: "false".to_string(),
        message: message.to_string(),
    })
}

/// `assert.sameValue(actual, expected, message)`
///
/// Primitives use SameValue; objects compare by identity.
pub fn same_value(actual: &Value, expected: &Value, message: &str) -> AssertResult {
    if actual.same_value(expected) {
        return Ok(());
    }
    Err(AssertionFailure::AssertionFailed {
        expected: expected.describe(),
        actual: actual.describe(),
        message: message.to_string(),
    })
}

/// `assert.notSameValue(actual, unexpected, message)`
pub fn not_same_value(actual: &Value, unexpected: &Value, message: &str) -> AssertResult {
    if !actual.same_value(unexpected) {
        return Ok(());
    }
    Err(AssertionFailure::AssertionFailed {
        expected: format!("not {}", unexpected.describe()),
        actual: actual.describe(),
        message: message.to_string(),
    })
}

/// `assert.throws(Kind, operation, message)`
pub fn throws<T>(
    expected: ErrorKind,
    operation: impl FnOnce() -> Result<T, ThrownError>,
    message: &str,
) -> AssertResult {
    match operation() {
        Ok(_) => Err(AssertionFailure::ExpectedErrorNotRaised {
            expected: expected.to_string(),
            message: message.to_string(),
        }),
        Err(error) if error.kind == expected => Ok(()),
        Err(error) => Err(AssertionFailure::WrongErrorKind {
            expected: expected.to_string(),
            actual: error.kind.to_string(),
            message: message.to_string(),
        }),
    }
}

/// `assert.compareArray(actual, expected, message)`
pub fn compare_array(actual: &[Value], expected: &[Value], message: &str) -> AssertResult {
    let matches = actual.len() == expected.len()
        && actual.iter().zip(expected).all(|(a, e)| a.same_value(e));
    if matches {
        return Ok(());
    }
    Err(AssertionFailure::AssertionFailed {
        expected: format_array(expected),
        actual: format_array(actual),
        message: message.to_string(),
    })
}

fn format_array(values: &[Value]) -> String {
    let items: Vec<String> = values.iter().map(Value::describe).collect();
    format!("[{}]", items.join(", "))
}

/// Expected attributes for [`verify_property`]; `None` fields are not checked
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpectedDescriptor {
    /// Expected value (SameValue)
    pub value: Option<Value>,
    /// Expected `[[Writable]]`
    pub writable: Option<bool>,
    /// Expected `[[Enumerable]]`
    pub enumerable: Option<bool>,
    /// Expected `[[Configurable]]`
    pub configurable: Option<bool>,
}

impl ExpectedDescriptor {
    /// The writable / enumerable / configurable triple
    pub fn attributes(writable: bool, enumerable: bool, configurable: bool) -> Self {
        Self {
            value: None,
            writable: Some(writable),
            enumerable: Some(enumerable),
            configurable: Some(configurable),
        }
    }

    /// Also check the value
    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// Compare a descriptor against expectations, field by field
///
/// Fields are checked in the order value, writable, enumerable,
/// configurable; the first deviation is reported.
pub fn verify_descriptor(
    attribute: &str,
    actual: Option<&PropertyDescriptor>,
    expected: &ExpectedDescriptor,
) -> AssertResult {
    let mismatch = |field: &str, expected: String, actual: String| {
        Err(AssertionFailure::PropertyDescriptorMismatch {
            attribute: attribute.to_string(),
            field: field.to_string(),
            expected,
            actual,
        })
    };

    let Some(actual) = actual else {
        return mismatch("present", "true".to_string(), "false".to_string());
    };

    if let Some(value) = &expected.value {
        if !actual.value.same_value(value) {
            return mismatch("value", value.describe(), actual.value.describe());
        }
    }
    let flags = [
        ("writable", expected.writable, actual.writable),
        ("enumerable", expected.enumerable, actual.enumerable),
        ("configurable", expected.configurable, actual.configurable),
    ];
    for (field, want, have) in flags {
        if let Some(want) = want {
            if want != have {
                return mismatch(field, want.to_string(), have.to_string());
            }
        }
    }
    Ok(())
}

/// `verifyProperty(object, name, expected)`
pub fn verify_property(
    realm: &Realm,
    object: ObjectId,
    name: &str,
    expected: &ExpectedDescriptor,
) -> AssertResult {
    verify_descriptor(name, realm.get_own_property(object, name), expected)
}
