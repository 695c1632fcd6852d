//! Value representation for assertion operands.
//!
//! This module provides the `Value` enum compared by the assertion library.
//! Primitive values are stored inline, composite values are referenced by an
//! [`ObjectId`] handle into the realm that created them.

use std::fmt;

/// Identity handle of a composite value inside one realm.
///
/// Two handles are the same object exactly when their indices are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub usize);

/// A value observed from the subject under test.
///
/// # Equality policy
///
/// [`Value::same_value`] implements SameValue for primitives: `NaN` is the
/// same as `NaN` and `+0` differs from `-0`. Composite values compare by
/// reference identity only; two distinct objects with identical contents
/// are never the same value.
///
/// # Examples
///
/// ```
/// use core_types::{ObjectId, Value};
///
/// assert!(Value::Number(f64::NAN).same_value(&Value::Number(f64::NAN)));
/// assert!(!Value::Number(0.0).same_value(&Value::Number(-0.0)));
/// assert!(Value::Object(ObjectId(3)).same_value(&Value::Object(ObjectId(3))));
/// assert!(!Value::Object(ObjectId(3)).same_value(&Value::Object(ObjectId(4))));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The undefined value
    Undefined,
    /// The null value
    Null,
    /// A boolean (true or false)
    Boolean(bool),
    /// IEEE 754 double-precision number
    Number(f64),
    /// A string value
    String(String),
    /// A composite value, by identity
    Object(ObjectId),
}

impl Value {
    /// SameValue comparison (see the type-level equality policy).
    pub fn same_value(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => {
                if a.is_nan() && b.is_nan() {
                    true
                } else {
                    a == b && a.is_sign_negative() == b.is_sign_negative()
                }
            }
            (Value::Object(a), Value::Object(b)) => a == b,
            (a, b) => a == b,
        }
    }

    /// Returns whether this value is truthy.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_types::Value;
    ///
    /// assert!(!Value::Undefined.is_truthy());
    /// assert!(!Value::Number(f64::NAN).is_truthy());
    /// assert!(!Value::String(String::new()).is_truthy());
    /// assert!(Value::Number(-1.0).is_truthy());
    /// ```
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined => false,
            Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Number(n) => !n.is_nan() && *n != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Object(_) => true,
        }
    }

    /// Returns the `typeof` result for this value.
    ///
    /// Objects report `"object"`; callability lives in the realm, not the
    /// handle.
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Object(_) => "object",
        }
    }

    /// The object handle, if this is a composite value.
    pub fn as_object(&self) -> Option<ObjectId> {
        match self {
            Value::Object(id) => Some(*id),
            _ => None,
        }
    }

    /// Render the value the way assertion messages quote operands.
    ///
    /// Strings are quoted, `-0` keeps its sign, objects show their handle.
    pub fn describe(&self) -> String {
        match self {
            Value::String(s) => format!("\"{}\"", s),
            Value::Number(n) if *n == 0.0 && n.is_sign_negative() => "-0".to_string(),
            Value::Object(ObjectId(id)) => format!("[object #{}]", id),
            other => other.to_string(),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<ObjectId> for Value {
    fn from(id: ObjectId) -> Self {
        Value::Object(id)
    }
}

/// String conversion following `String(value)` for primitives.
///
/// # Examples
///
/// ```
/// use core_types::Value;
///
/// assert_eq!(Value::Undefined.to_string(), "undefined");
/// assert_eq!(Value::Number(42.0).to_string(), "42");
/// assert_eq!(Value::Number(f64::INFINITY).to_string(), "Infinity");
/// ```
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", if *b { "true" } else { "false" }),
            Value::Number(n) => {
                if n.is_nan() {
                    write!(f, "NaN")
                } else if n.is_infinite() {
                    if n.is_sign_positive() {
                        write!(f, "Infinity")
                    } else {
                        write!(f, "-Infinity")
                    }
                } else if n.fract() == 0.0 && n.abs() < 1e15 {
                    // Integer-valued doubles display without decimal point
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::String(s) => write!(f, "{}", s),
            Value::Object(_) => write!(f, "[object Object]"),
        }
    }
}
