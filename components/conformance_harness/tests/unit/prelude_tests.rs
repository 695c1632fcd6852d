//! Unit tests for helper resolution and program composition

use conformance_harness::{HelperError, HelperRegistry, Program, TestCase};

fn case(header: &str, body: &str) -> TestCase {
    TestCase::from_source("compose.js", format!("/*---\n{}\n---*/\n{}", header, body)).unwrap()
}

#[test]
fn test_bundled_helpers_resolve() {
    let helpers = HelperRegistry::bundled();
    for name in HelperRegistry::bundled_names() {
        assert!(!helpers.resolve(name).unwrap().is_empty(), "{}", name);
    }
    assert!(helpers.resolve("sta.js").unwrap().contains("Test262:Failure "));
}

#[test]
fn test_unknown_helper_is_unresolved() {
    let helpers = HelperRegistry::bundled();
    assert!(matches!(
        helpers.resolve("testTypedArray.js"),
        Err(HelperError::Unresolved(name)) if name == "testTypedArray.js"
    ));
}

#[test]
fn test_path_escapes_are_rejected() {
    let helpers = HelperRegistry::with_includes_dir(".");
    assert!(matches!(
        helpers.resolve("../secret.js"),
        Err(HelperError::InvalidName(_))
    ));
}

#[test]
fn test_includes_dir_lookup() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("fnGlobalObject.js"), "var fnGlobalObject = 1;\n").unwrap();
    std::fs::write(dir.path().join("assert.js"), "// upstream assert\n").unwrap();

    let helpers = HelperRegistry::with_includes_dir(dir.path());
    assert_eq!(&*helpers.resolve("fnGlobalObject.js").unwrap(), "var fnGlobalObject = 1;\n");
    // core helpers carry the failure protocol and are never replaced
    assert!(HelperRegistry::is_core("assert.js"));
    assert_ne!(&*helpers.resolve("assert.js").unwrap(), "// upstream assert\n");
}

#[test]
fn test_includes_dir_helper_wins_over_bundled_copy() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("propertyHelper.js"),
        "function verifyProperty() {}\nfunction verifyNotWritable() {}\n",
    )
    .unwrap();

    let helpers = HelperRegistry::with_includes_dir(dir.path());
    let program = Program::compose(
        &case("includes: [propertyHelper.js, compareArray.js]", "verifyNotWritable();\n"),
        &helpers,
    )
    .unwrap();

    assert!(program.source.contains("function verifyNotWritable"));
    // not in the directory, so the bundled copy fills in
    assert!(program.source.contains("function compareArray("));
    assert_eq!(
        program.includes,
        vec!["assert.js", "sta.js", "shell.js", "propertyHelper.js", "compareArray.js"]
    );
}

#[test]
fn test_bundled_copy_without_includes_dir() {
    let helpers = HelperRegistry::bundled();
    assert!(helpers.resolve("propertyHelper.js").unwrap().contains("function verifyProperty"));
}

#[test]
fn test_compose_order() {
    let helpers = HelperRegistry::bundled();
    let program = Program::compose(
        &case("flags: [onlyStrict, async]\nincludes: [compareArray.js]", "$DONE();\n"),
        &helpers,
    )
    .unwrap();

    assert!(program.strict);
    assert!(program.is_async);
    assert!(program.source.starts_with("\"use strict\";\n"));
    assert_eq!(
        program.includes,
        vec!["assert.js", "sta.js", "shell.js", "doneprintHandle.js", "compareArray.js"]
    );
    assert!(program.source.ends_with("$DONE();\n"));

    let done = program.source.find("function $DONE").unwrap();
    let compare = program.source.find("compareArray").unwrap();
    assert!(done < compare);
}

#[test]
fn test_compose_raw_is_untouched() {
    let helpers = HelperRegistry::bundled();
    let case = case("flags: [raw, onlyStrict]", "1;\n");
    let program = Program::compose(&case, &helpers).unwrap();
    assert_eq!(program.source, case.source);
    assert!(program.includes.is_empty());
    assert!(!program.strict);
}

#[test]
fn test_compose_module_and_shell_options() {
    let helpers = HelperRegistry::bundled();
    let case = TestCase::from_source(
        "mod.mjs",
        "// |reftest| shell-option(--enable-import-attributes)\n/*---\nflags: [module]\n---*/\nexport {};\n",
    )
    .unwrap();
    let program = Program::compose(&case, &helpers).unwrap();
    assert!(program.module);
    assert_eq!(program.host_args, vec!["--enable-import-attributes"]);
}

#[test]
fn test_compose_fails_on_missing_include() {
    let helpers = HelperRegistry::bundled();
    let result = Program::compose(&case("includes: [nope.js]", ""), &helpers);
    assert!(matches!(result, Err(HelperError::Unresolved(_))));
}
