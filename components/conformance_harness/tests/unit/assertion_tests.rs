//! Unit tests for the assertion library

use conformance_harness::assertion::{
    compare_array, ensure, not_same_value, same_value, throws, verify_descriptor, verify_property,
};
use conformance_harness::{
    AssertionFailure, ErrorKind, ExpectedDescriptor, PropertyDescriptor, Realm, ThrownError, Value,
};

#[test]
fn test_same_value_semantics() {
    assert!(same_value(&Value::Number(f64::NAN), &Value::Number(f64::NAN), "").is_ok());
    assert!(same_value(&Value::Number(0.0), &Value::Number(-0.0), "").is_err());
    assert!(same_value(&Value::from("a"), &Value::from("a"), "").is_ok());
    assert!(same_value(&Value::Null, &Value::Undefined, "").is_err());
}

#[test]
fn test_objects_compare_by_identity() {
    let mut realm = Realm::new();
    let a = realm.create_object(None);
    let b = realm.create_object(None);
    assert!(same_value(&Value::Object(a), &Value::Object(a), "").is_ok());
    assert!(same_value(&Value::Object(a), &Value::Object(b), "").is_err());
}

#[test]
fn test_same_value_failure_carries_message() {
    let failure = same_value(&Value::from(1), &Value::from(2), "one is two").unwrap_err();
    assert_eq!(
        failure,
        AssertionFailure::AssertionFailed {
            expected: "2".to_string(),
            actual: "1".to_string(),
            message: "one is two".to_string(),
        }
    );
}

#[test]
fn test_not_same_value() {
    assert!(not_same_value(&Value::from(1), &Value::from(2), "").is_ok());
    assert!(not_same_value(&Value::from(1), &Value::from(1), "").is_err());
}

#[test]
fn test_ensure() {
    assert!(ensure(true, "fine").is_ok());
    let failure = ensure(false, "must hold").unwrap_err();
    assert_eq!(failure.to_string(), "must hold: expected true but got false");
}

#[test]
fn test_throws_expected_kind() {
    let result = throws(
        ErrorKind::RangeError,
        || Err::<(), _>(ThrownError::new(ErrorKind::RangeError, "bad")),
        "",
    );
    assert!(result.is_ok());
}

#[test]
fn test_throws_nothing_raised() {
    let failure = throws(ErrorKind::RangeError, || Ok(1), "no error").unwrap_err();
    assert_eq!(
        failure,
        AssertionFailure::ExpectedErrorNotRaised {
            expected: "RangeError".to_string(),
            message: "no error".to_string(),
        }
    );
}

#[test]
fn test_throws_wrong_kind() {
    let failure = throws(
        ErrorKind::RangeError,
        || Err::<(), _>(ThrownError::new(ErrorKind::TypeError, "oops")),
        "",
    )
    .unwrap_err();
    assert!(matches!(
        failure,
        AssertionFailure::WrongErrorKind { ref actual, .. } if actual == "TypeError"
    ));
}

#[test]
fn test_compare_array() {
    let a = [Value::from(1), Value::from("x")];
    assert!(compare_array(&a, &a.clone(), "").is_ok());
    let failure = compare_array(&a, &[Value::from(1)], "").unwrap_err();
    assert_eq!(failure.to_string(), "expected [1] but got [1, \"x\"]");
}

#[test]
fn test_verify_property_attributes() {
    let mut realm = Realm::new();
    let obj = realm.create_object(None);
    realm
        .define_property(obj, "length", PropertyDescriptor::new(Value::from(1), false, false, true))
        .unwrap();

    let expected = ExpectedDescriptor::attributes(false, false, true).with_value(1);
    assert!(verify_property(&realm, obj, "length", &expected).is_ok());

    let wrong = ExpectedDescriptor::attributes(true, false, true);
    assert_eq!(
        verify_property(&realm, obj, "length", &wrong).unwrap_err(),
        AssertionFailure::PropertyDescriptorMismatch {
            attribute: "length".to_string(),
            field: "writable".to_string(),
            expected: "true".to_string(),
            actual: "false".to_string(),
        }
    );
}

#[test]
fn test_verify_missing_property() {
    let failure = verify_descriptor("name", None, &ExpectedDescriptor::default()).unwrap_err();
    assert!(matches!(
        failure,
        AssertionFailure::PropertyDescriptorMismatch { ref field, .. } if field == "present"
    ));
}

#[test]
fn test_failure_json_round_trip() {
    let failure = AssertionFailure::PropertyDescriptorMismatch {
        attribute: "name".to_string(),
        field: "enumerable".to_string(),
        expected: "false".to_string(),
        actual: "true".to_string(),
    };
    let json = serde_json::to_string(&failure).unwrap();
    assert!(json.contains("\"kind\":\"PropertyDescriptorMismatch\""));
    let back: AssertionFailure = serde_json::from_str(&json).unwrap();
    assert_eq!(back, failure);
}
