//! Unit tests for the test harness

use conformance_harness::{
    Capabilities, ErrorKind, ExecutionResult, FailReason, Harness, NativeHost, SkipReason,
    TestCase, ThrownError,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn case(id: &str, header: &str) -> TestCase {
    TestCase::from_source(id, format!("/*---\n{}\n---*/\n", header)).unwrap()
}

#[test]
fn test_harness_defaults() {
    let harness = Harness::new(NativeHost::new());
    assert_eq!(harness.timeout(), Duration::from_millis(10_000));
    assert!(harness.jobs() >= 1);
    assert!(harness.capabilities().supports_feature("BigInt"));
}

#[test]
fn test_builder_settings() {
    let harness = Harness::new(NativeHost::new())
        .with_timeout(Duration::from_millis(250))
        .with_jobs(0)
        .with_capabilities(Capabilities::empty());
    assert_eq!(harness.timeout(), Duration::from_millis(250));
    assert_eq!(harness.jobs(), 1);
    assert!(!harness.capabilities().supports_feature("BigInt"));
}

#[test]
fn test_result_predicates() {
    assert!(ExecutionResult::Pass.is_pass());
    assert!(ExecutionResult::Timeout.is_timeout());
    assert!(ExecutionResult::Cancelled.is_cancelled());
    assert!(ExecutionResult::Crash("x".to_string()).is_crash());
    assert!(ExecutionResult::Skip(SkipReason::Directive("x".to_string())).is_skip());
    assert!(!ExecutionResult::Skip(SkipReason::Directive("x".to_string())).is_unsuccessful());
    assert!(ExecutionResult::Timeout.is_unsuccessful());
}

#[test]
fn test_result_display() {
    let uncaught = ExecutionResult::Fail(FailReason::Uncaught(ThrownError::new(
        ErrorKind::TypeError,
        "not a function",
    )));
    assert_eq!(uncaught.to_string(), "uncaught TypeError: not a function");
    assert_eq!(
        ExecutionResult::Skip(SkipReason::UnsupportedFeatures(vec!["Temporal".to_string()]))
            .to_string(),
        "missing features: Temporal"
    );
}

#[test]
fn test_gated_test_never_reaches_body() {
    let invoked = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&invoked);
    let host = NativeHost::new().with("gated.js", move |_| {
        flag.store(true, Ordering::SeqCst);
        Ok(())
    });
    let harness = Harness::new(host);

    let result = harness.run_test(&case("gated.js", "features: [Temporal]"));
    assert_eq!(
        result,
        ExecutionResult::Skip(SkipReason::UnsupportedFeatures(vec!["Temporal".to_string()]))
    );
    assert!(!invoked.load(Ordering::SeqCst));
}

#[test]
fn test_unregistered_body_is_crash() {
    let harness = Harness::new(NativeHost::new());
    assert!(harness.run_test(&case("missing.js", "description: x")).is_crash());
}

#[test]
fn test_unresolved_include_is_crash() {
    let host = NativeHost::new().with("inc.js", |_| Ok(()));
    let harness = Harness::new(host);
    match harness.run_test(&case("inc.js", "includes: [noSuchHelper.js]")) {
        ExecutionResult::Crash(reason) => assert!(reason.contains("noSuchHelper.js")),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_cancelled_harness_does_not_launch() {
    let host = NativeHost::new().with("c.js", |_| Ok(()));
    let harness = Harness::new(host);
    harness.cancellation().cancel();
    assert_eq!(
        harness.run_test(&case("c.js", "description: x")),
        ExecutionResult::Cancelled
    );
}

#[test]
fn test_run_cases_reports_each_once() {
    let host = NativeHost::new()
        .with("a.js", |_| Ok(()))
        .with("b.js", |_| Ok(()))
        .with("c.js", |_| Ok(()));
    let harness = Harness::new(host).with_jobs(2);
    let report = harness.run_cases(vec![
        case("a.js", "description: a"),
        case("b.js", "description: b"),
        case("c.js", "features: [Temporal]"),
    ]);
    assert_eq!(report.total, 3);
    assert_eq!(report.passed, 2);
    assert_eq!(report.skipped, 1);
    assert!(report.is_success());
}

#[test]
fn test_fail_fast_does_not_poison_later_runs() {
    let host = NativeHost::new()
        .with("fails.js", |_| {
            Err(ThrownError::new(ErrorKind::TypeError, "boom").into())
        })
        .with("later.js", |_| Ok(()));
    let harness = Harness::new(host).with_jobs(1).with_fail_fast(true);
    let cases = || {
        vec![
            case("fails.js", "description: fails"),
            case("later.js", "description: later"),
        ]
    };

    for _ in 0..2 {
        let report = harness.run_cases(cases());
        assert_eq!(report.failed, 1);
        assert_eq!(report.cancelled, 1);
        assert!(report.record("later.js").unwrap().result.is_cancelled());
    }
    assert!(!harness.cancellation().is_cancelled());
}

#[test]
fn test_harness_token_cancels_whole_runs() {
    let host = NativeHost::new().with("a.js", |_| Ok(()));
    let harness = Harness::new(host);
    harness.cancellation().cancel();
    let report = harness.run_cases(vec![case("a.js", "description: a")]);
    assert_eq!(report.cancelled, 1);
}
