//! Unit tests for Value and PropertyDescriptor

use core_types::{ObjectId, PropertyDescriptor, Value};

#[cfg(test)]
mod same_value_tests {
    use super::*;

    #[test]
    fn test_same_value_primitives() {
        assert!(Value::Undefined.same_value(&Value::Undefined));
        assert!(Value::Null.same_value(&Value::Null));
        assert!(Value::Boolean(true).same_value(&Value::Boolean(true)));
        assert!(!Value::Boolean(true).same_value(&Value::Boolean(false)));
        assert!(Value::from("abc").same_value(&Value::from("abc")));
    }

    #[test]
    fn test_same_value_nan_is_nan() {
        assert!(Value::Number(f64::NAN).same_value(&Value::Number(f64::NAN)));
    }

    #[test]
    fn test_same_value_signed_zero() {
        assert!(!Value::Number(0.0).same_value(&Value::Number(-0.0)));
        assert!(Value::Number(-0.0).same_value(&Value::Number(-0.0)));
    }

    #[test]
    fn test_same_value_objects_by_identity() {
        let a = Value::Object(ObjectId(1));
        let b = Value::Object(ObjectId(2));
        assert!(a.same_value(&a.clone()));
        assert!(!a.same_value(&b));
    }
}

#[cfg(test)]
mod conversion_tests {
    use super::*;

    #[test]
    fn test_display_numbers() {
        assert_eq!(Value::Number(1.5).to_string(), "1.5");
        assert_eq!(Value::Number(-7.0).to_string(), "-7");
        assert_eq!(Value::Number(f64::NEG_INFINITY).to_string(), "-Infinity");
        assert_eq!(Value::Number(f64::NAN).to_string(), "NaN");
    }

    #[test]
    fn test_describe_quotes_strings() {
        assert_eq!(Value::from("x").describe(), "\"x\"");
        assert_eq!(Value::Boolean(false).describe(), "false");
    }

    #[test]
    fn test_type_of() {
        assert_eq!(Value::Null.type_of(), "object");
        assert_eq!(Value::from(3).type_of(), "number");
        assert_eq!(Value::from(ObjectId(0)).type_of(), "object");
    }

    #[test]
    fn test_as_object() {
        assert_eq!(Value::Object(ObjectId(9)).as_object(), Some(ObjectId(9)));
        assert_eq!(Value::Null.as_object(), None);
    }
}

#[cfg(test)]
mod descriptor_tests {
    use super::*;

    #[test]
    fn test_descriptor_presets() {
        let data = PropertyDescriptor::data(Value::Null);
        assert!(data.writable && data.enumerable && data.configurable);

        let frozen = PropertyDescriptor::frozen(Value::Null);
        assert!(!frozen.writable && !frozen.enumerable && !frozen.configurable);
    }
}
