//! Fix plugin end to end: the tool rewrites fixtures in place and the
//! plugin compares them against their expected partners.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

use attest_core::fs::OsFileSystem;
use attest_core::results::{FailCause, TestStatus};
use attest_plugins::runner::{has_failures, run_tree};

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn config(exec_cmd: &str) -> String {
    format!(
        r#"
[general]
exec_cmd = "{exec_cmd}"
tags = ["fix"]
description = "fix suite"
suite_name = "fix"

[fix]
"#
    )
}

#[test]
fn tool_output_matching_expected_passes() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    // The "fixer" writes the corrected content into the test file,
    // which `sh -c` receives as `$0`.
    write(
        &root.join("attest.toml"),
        &config(r#"sh -c 'printf \"class Example {}\\n\" > \"$0\"'"#),
    );
    write(&root.join("Test1Test.java"), "class example {}\n");
    write(&root.join("Test1Expected.java"), "class Example {}\n");

    let suites = run_tree(Arc::new(OsFileSystem), root).unwrap();
    assert_eq!(suites[0].results.len(), 1);
    assert_eq!(suites[0].results[0].status, TestStatus::Pass);
    assert_eq!(
        fs::read_to_string(root.join("Test1Test.java")).unwrap(),
        "class Example {}\n"
    );
    assert!(!has_failures(&suites));
}

#[test]
fn unchanged_content_fails_with_diff() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    write(&root.join("attest.toml"), &config("true"));
    write(&root.join("Test1Test.java"), "class example {}\n");
    write(&root.join("Test1Expected.java"), "class Example {}\n");

    let suites = run_tree(Arc::new(OsFileSystem), root).unwrap();
    match &suites[0].results[0].status {
        TestStatus::Fail(FailCause::ContentDiff(summary)) => {
            assert!(summary.contains("line 1"));
            assert!(summary.contains("class example {}"));
        }
        other => panic!("expected content diff, got {other:?}"),
    }
    assert!(has_failures(&suites));
}

#[test]
fn missing_expected_partner_is_an_execution_error() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    // A failing command proves no process ran for the orphan unit.
    write(&root.join("attest.toml"), &config("false"));
    write(&root.join("OrphanTest.java"), "class A {}\n");

    let suites = run_tree(Arc::new(OsFileSystem), root).unwrap();
    assert_eq!(suites[0].results.len(), 1);
    match &suites[0].results[0].status {
        TestStatus::ExecutionError(message) => {
            assert!(message.contains("expected file not found"));
            assert!(message.contains("OrphanExpected.java"));
        }
        other => panic!("expected execution error, got {other:?}"),
    }
}

#[test]
fn fixture_without_test_suffix_is_an_execution_error() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    // A widened resource pattern can match files whose name cannot be
    // transformed into an expected pair; they must not vanish.
    write(
        &root.join("attest.toml"),
        r#"
[general]
exec_cmd = "false"
tags = ["fix"]
description = "fix suite"
suite_name = "fix"

[fix]
resource_name_pattern = ".*\\.java"
"#,
    );
    write(&root.join("Plain.java"), "class A {}\n");

    let suites = run_tree(Arc::new(OsFileSystem), root).unwrap();
    assert_eq!(suites[0].results.len(), 1);
    assert!(suites[0].results[0].unit.test().ends_with("Plain.java"));
    match &suites[0].results[0].status {
        TestStatus::ExecutionError(message) => {
            assert!(message.contains("lacks the `Test` suffix"));
        }
        other => panic!("expected execution error, got {other:?}"),
    }
    assert!(has_failures(&suites));
}

#[test]
fn line_endings_are_normalized_before_comparison() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    write(&root.join("attest.toml"), &config("true"));
    write(&root.join("CrlfTest.java"), "class A {}\r\nclass B {}\r\n");
    write(&root.join("CrlfExpected.java"), "class A {}\nclass B {}\n");

    let suites = run_tree(Arc::new(OsFileSystem), root).unwrap();
    assert_eq!(suites[0].results[0].status, TestStatus::Pass);
}

#[test]
fn units_come_back_in_sorted_order() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    write(&root.join("attest.toml"), &config("true"));
    for name in ["CTest.java", "ATest.java", "BTest.java"] {
        write(&root.join(name), "x\n");
        write(&root.join(name.replace("Test", "Expected")), "x\n");
    }

    let suites = run_tree(Arc::new(OsFileSystem), root).unwrap();
    let names: Vec<_> = suites[0]
        .results
        .iter()
        .map(|r| r.unit.test().file_name().unwrap().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["ATest.java", "BTest.java", "CTest.java"]);
}
