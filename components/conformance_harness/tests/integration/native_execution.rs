//! Integration tests for native bodies: built-in shape checks, input
//! validation partitions, isolation and timing

use conformance_harness::assertion::{ensure, same_value, throws};
use conformance_harness::realm::{FUNCTION_PROTOTYPE, OBJECT_PROTOTYPE};
use conformance_harness::{
    AssertionFailure, ErrorKind, ExecutionResult, FailReason, Harness, NativeHost, ObjectId,
    PropertyDescriptor, Realm, TestCase, TestContext, ThrownError, Value,
};
use regex::Regex;
use std::sync::LazyLock;
use std::thread;
use std::time::{Duration, Instant};

fn case(id: &str, header: &str) -> TestCase {
    TestCase::from_source(id, format!("/*---\n{}\n---*/\n", header)).unwrap()
}

/// Install `Temporal.ZonedDateTime.from` into a realm
fn install_from(realm: &mut Realm, as_constructor: bool) -> Result<(), ThrownError> {
    let temporal = realm.create_object(realm.intrinsic(OBJECT_PROTOTYPE));
    let zoned = realm.create_function("ZonedDateTime", 0, true);
    let from = realm.create_function("from", 1, as_constructor);
    realm.define_property(zoned, "from", PropertyDescriptor::builtin_method(Value::Object(from)))?;
    realm.define_property(
        temporal,
        "ZonedDateTime",
        PropertyDescriptor::builtin_method(Value::Object(zoned)),
    )?;
    realm.set_global("Temporal", Value::Object(temporal));
    Ok(())
}

fn resolve_from(ctx: &mut TestContext, as_constructor: bool) -> Result<Value, ThrownError> {
    install_from(ctx.realm_mut(), as_constructor)?;
    ctx.realm().resolve("Temporal.ZonedDateTime.from")
}

fn object(value: &Value) -> Result<ObjectId, ThrownError> {
    value
        .as_object()
        .ok_or_else(|| ThrownError::new(ErrorKind::TypeError, format!("{} is not an object", value)))
}

fn builtin_host(as_constructor: bool) -> NativeHost {
    NativeHost::new()
        .with("from/extensible.js", move |ctx| {
            let from = resolve_from(ctx, as_constructor)?;
            let id = object(&from)?;
            ensure(ctx.realm().is_extensible(id), "Built-in objects must be extensible.")?;
            Ok(())
        })
        .with("from/proto.js", move |ctx| {
            let from = resolve_from(ctx, as_constructor)?;
            let id = object(&from)?;
            let expected = ctx.realm().intrinsic(FUNCTION_PROTOTYPE).map(Value::Object);
            same_value(
                &ctx.realm().get_prototype_of(id),
                &expected.unwrap_or(Value::Null),
                "Built-in prototype objects must be Function.prototype.",
            )?;
            Ok(())
        })
        .with("from/builtin.js", move |ctx| {
            let from = resolve_from(ctx, as_constructor)?;
            same_value(
                &Value::from(ctx.realm().to_string_tag(&from)),
                &Value::from("[object Function]"),
                "Built-in Functions are Function objects.",
            )?;
            Ok(())
        })
        .with("from/no-prototype.js", move |ctx| {
            let from = resolve_from(ctx, as_constructor)?;
            let id = object(&from)?;
            ensure(
                !ctx.realm().has_own_property(id, "prototype"),
                "Built-in functions don't have a prototype property.",
            )?;
            Ok(())
        })
}

const BUILTIN_IDS: [&str; 4] = [
    "from/extensible.js",
    "from/proto.js",
    "from/builtin.js",
    "from/no-prototype.js",
];

#[test]
fn test_builtin_function_shape_passes() {
    let harness = Harness::new(builtin_host(false));
    for id in BUILTIN_IDS {
        assert_eq!(
            harness.run_test(&case(id, "features: [Symbol]")),
            ExecutionResult::Pass,
            "{}",
            id
        );
    }
}

#[test]
fn test_builtin_violation_cites_its_message() {
    let harness = Harness::new(builtin_host(true));
    let report = harness.run_cases(
        BUILTIN_IDS
            .iter()
            .map(|id| case(id, "description: shape"))
            .collect(),
    );
    assert_eq!(report.passed, 3);
    assert_eq!(report.failed, 1);

    let failure = report.failures().next().unwrap();
    assert_eq!(failure.id, "from/no-prototype.js");
    match &failure.result {
        ExecutionResult::Fail(FailReason::Assertion(AssertionFailure::AssertionFailed {
            message,
            ..
        })) => assert_eq!(message, "Built-in functions don't have a prototype property."),
        other => panic!("unexpected {:?}", other),
    }
}

static DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?P(?:\d+Y)?(?:\d+M)?(?:\d+W)?(?:\d+D)?(?:T(?:\d+H)?(?:\d+M)?(?:\d+S)?)?$")
        .unwrap()
});

/// Subject under test: an ISO 8601 duration parser
fn parse_duration(text: &str, lenient: bool) -> Result<String, ThrownError> {
    let incomplete = text.ends_with('P') || (!lenient && text.ends_with('T'));
    if !DURATION.is_match(text) || incomplete {
        return Err(ThrownError::new(
            ErrorKind::RangeError,
            format!("invalid duration {:?}", text),
        ));
    }
    Ok(text.to_string())
}

const VALID: [&str; 4] = ["P1D", "PT1H", "P1Y2M", "-P3W"];
const INVALID: [&str; 4] = ["", "P", "1D", "PT"];

fn duration_host(lenient: bool) -> NativeHost {
    let mut host = NativeHost::new();
    for (n, input) in VALID.into_iter().enumerate() {
        host.register(format!("duration/valid-{}.js", n), move |_| {
            let parsed = parse_duration(input, lenient)?;
            same_value(&Value::from(parsed), &Value::from(input), input)?;
            Ok(())
        });
    }
    for (n, input) in INVALID.into_iter().enumerate() {
        host.register(format!("duration/invalid-{}.js", n), move |_| {
            throws(ErrorKind::RangeError, || parse_duration(input, lenient), input)?;
            Ok(())
        });
    }
    host
}

fn duration_cases() -> Vec<TestCase> {
    (0..4)
        .flat_map(|n| {
            [
                case(&format!("duration/valid-{}.js", n), "description: valid"),
                case(&format!("duration/invalid-{}.js", n), "description: invalid"),
            ]
        })
        .collect()
}

#[test]
fn test_valid_and_invalid_inputs_are_separate_units() {
    let harness = Harness::new(duration_host(false)).with_jobs(4);
    let report = harness.run_cases(duration_cases());
    assert_eq!(report.total, 8);
    assert_eq!(report.passed, 8);
}

#[test]
fn test_lenient_subject_fails_only_the_affected_unit() {
    let harness = Harness::new(duration_host(true)).with_jobs(4);
    let report = harness.run_cases(duration_cases());
    assert_eq!(report.passed, 7);

    let failed: Vec<&str> = report.failures().map(|r| r.id.as_str()).collect();
    assert_eq!(failed, vec!["duration/invalid-3.js"]);
    assert!(matches!(
        &report.failures().next().unwrap().result,
        ExecutionResult::Fail(FailReason::Assertion(AssertionFailure::ExpectedErrorNotRaised {
            message,
            ..
        })) if message == "PT"
    ));
}

#[test]
fn test_negative_native_bodies() {
    let host = NativeHost::new()
        .with("neg/raises.js", |_| {
            Err(ThrownError::new(ErrorKind::RangeError, "out of range").into())
        })
        .with("neg/wrong.js", |_| {
            Err(ThrownError::new(ErrorKind::TypeError, "wrong").into())
        })
        .with("neg/quiet.js", |_| Ok(()));
    let harness = Harness::new(host);
    let header = "negative:\n  phase: runtime\n  type: RangeError";

    assert_eq!(harness.run_test(&case("neg/raises.js", header)), ExecutionResult::Pass);
    assert!(matches!(
        harness.run_test(&case("neg/wrong.js", header)),
        ExecutionResult::Fail(FailReason::Negative(AssertionFailure::WrongErrorKind { .. }))
    ));
    match harness.run_test(&case("neg/quiet.js", header)) {
        ExecutionResult::Fail(FailReason::Negative(AssertionFailure::ExpectedErrorNotRaised {
            message,
            ..
        })) => assert_eq!(message, "expected failure did not occur"),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_uncaught_error_in_positive_test() {
    let host = NativeHost::new().with("throws.js", |ctx| {
        ctx.realm().resolve("Missing.thing")?;
        Ok(())
    });
    match Harness::new(host).run_test(&case("throws.js", "description: x")) {
        ExecutionResult::Fail(FailReason::Uncaught(error)) => {
            assert_eq!(error.kind, ErrorKind::ReferenceError)
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_every_execution_gets_a_fresh_realm() {
    let host = NativeHost::new().with("isolated.js", |ctx| {
        same_value(&ctx.realm().global("leak"), &Value::Undefined, "no leftovers")?;
        ctx.realm_mut().set_global("leak", 1);
        Ok(())
    });
    let harness = Harness::new(host);
    let case = case("isolated.js", "description: isolation");

    let first = harness.run_test(&case);
    let second = harness.run_test(&case);
    assert_eq!(first, ExecutionResult::Pass);
    assert_eq!(first, second);
}

#[test]
fn test_async_body_that_never_signals_times_out() {
    let host = NativeHost::new().with("never.js", |_| Ok(()));
    let harness = Harness::new(host).with_timeout(Duration::from_millis(200));

    let started = Instant::now();
    let result = harness.run_test(&case("never.js", "flags: [async]"));
    let elapsed = started.elapsed();

    assert_eq!(result, ExecutionResult::Timeout);
    assert!(elapsed >= Duration::from_millis(200));
    assert!(elapsed < Duration::from_secs(5));
}

#[test]
fn test_stuck_body_is_abandoned_at_the_deadline() {
    let host = NativeHost::new().with("stuck.js", |ctx| {
        while !ctx.is_abandoned() {
            thread::sleep(Duration::from_millis(5));
        }
        Ok(())
    });
    let harness = Harness::new(host).with_timeout(Duration::from_millis(100));
    assert_eq!(
        harness.run_test(&case("stuck.js", "description: stuck")),
        ExecutionResult::Timeout
    );
}

#[test]
fn test_async_completion_from_another_thread() {
    let host = NativeHost::new()
        .with("later.js", |ctx| {
            let completion = ctx.completion();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                completion.done();
            });
            Ok(())
        })
        .with("rejects.js", |ctx| {
            ctx.done_with_error("Test262Error: rejected");
            Ok(())
        })
        .with("printed.js", |ctx| {
            ctx.print("Test262:AsyncTestComplete");
            Ok(())
        });
    let harness = Harness::new(host).with_timeout(Duration::from_secs(5));

    assert_eq!(harness.run_test(&case("later.js", "flags: [async]")), ExecutionResult::Pass);
    assert_eq!(
        harness.run_test(&case("rejects.js", "flags: [async]")),
        ExecutionResult::Fail(FailReason::AsyncFailure("Test262Error: rejected".to_string()))
    );
    assert_eq!(harness.run_test(&case("printed.js", "flags: [async]")), ExecutionResult::Pass);
}

#[test]
fn test_panicking_body_is_crash() {
    let host = NativeHost::new().with("panics.js", |_| panic!("kaboom"));
    match Harness::new(host).run_test(&case("panics.js", "description: x")) {
        ExecutionResult::Crash(reason) => assert!(reason.contains("kaboom")),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_strict_mode_is_visible_to_body() {
    let host = NativeHost::new().with("strict.js", |ctx| {
        ensure(ctx.is_strict(), "strict")?;
        Ok(())
    });
    let harness = Harness::new(host);
    assert_eq!(
        harness.run_test(&case("strict.js", "flags: [onlyStrict]")),
        ExecutionResult::Pass
    );
    assert!(harness
        .run_test(&case("strict.js", "description: sloppy"))
        .is_fail());
}
