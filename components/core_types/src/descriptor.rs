//! Own-property attribute records.

use crate::Value;

/// The attributes of an own data property.
///
/// # Examples
///
/// ```
/// use core_types::{PropertyDescriptor, Value};
///
/// let desc = PropertyDescriptor::builtin_method(Value::Undefined);
/// assert!(desc.writable);
/// assert!(!desc.enumerable);
/// assert!(desc.configurable);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDescriptor {
    /// Current value of the property
    pub value: Value,
    /// Whether assignment changes the value
    pub writable: bool,
    /// Whether the property shows up in enumeration
    pub enumerable: bool,
    /// Whether the property can be deleted or redefined
    pub configurable: bool,
}

impl PropertyDescriptor {
    /// A property with explicit attributes.
    pub fn new(value: Value, writable: bool, enumerable: bool, configurable: bool) -> Self {
        Self {
            value,
            writable,
            enumerable,
            configurable,
        }
    }

    /// Default attributes of built-in data properties:
    /// writable, non-enumerable, configurable.
    pub fn builtin_method(value: Value) -> Self {
        Self::new(value, true, false, true)
    }

    /// Attributes of a plain assignment: everything true.
    pub fn data(value: Value) -> Self {
        Self::new(value, true, true, true)
    }

    /// A frozen property: nothing true.
    pub fn frozen(value: Value) -> Self {
        Self::new(value, false, false, false)
    }
}
