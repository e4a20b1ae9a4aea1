//! Fix-and-warn plugin end to end, plus the marker guard's restore
//! guarantees.

use std::fs;
use std::io;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tempfile::TempDir;

use attest_core::config::{FixAndWarnConfig, GeneralConfig, WarnConfig};
use attest_core::fs::{FileSystem, OsFileSystem};
use attest_core::results::{FailCause, TestStatus, TestUnit};
use attest_plugins::fix_and_warn::{FixAndWarnPlugin, MarkerGuard};
use attest_plugins::plugin::{Plugin, PluginContext};
use attest_plugins::runner::{has_failures, run_tree};

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// General half shared by the suite configs below: the tool is `sh`,
/// each half supplies its own `-c` payload through `exec_flags`, and
/// the appended fixture path becomes `$0`.
const GENERAL: &str = r#"
[general]
exec_cmd = "sh"
tags = ["fix-and-warn"]
description = "fix and warn suite"
suite_name = "fix-and-warn"
"#;

fn fix_and_warn_config() -> String {
    format!(
        r#"{GENERAL}
["fix and warn".fix]
exec_flags = "-c 'printf \"class example {{}}\\n\" > \"$0\"'"

["fix and warn".warn]
actual_warnings_pattern = "(.+):(\\d+):(\\d+): (.+)"
exec_flags = "-c 'echo \"$0:1:1: Class name in incorrect case\"'"
"#
    )
}

const EXPECTED_WITH_MARKER: &str =
    "// ;warn:1:1: Class name in incorrect case\nclass example {}\n";

#[test]
fn fixed_content_and_matching_warning_pass() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    write(&root.join("attest.toml"), &fix_and_warn_config());
    write(&root.join("Test1Test.java"), "class Example {}\n");
    write(&root.join("Test1Expected.java"), EXPECTED_WITH_MARKER);

    let suites = run_tree(Arc::new(OsFileSystem), root).unwrap();
    assert_eq!(suites[0].results.len(), 1);
    let result = &suites[0].results[0];
    match &result.unit {
        TestUnit::Fix { test, expected } => {
            assert!(test.ends_with("Test1Test.java"));
            assert!(expected.ends_with("Test1Expected.java"));
        }
        other => panic!("expected a fix unit, got {other:?}"),
    }
    assert_eq!(result.status, TestStatus::Pass);
    assert!(!has_failures(&suites));

    // The fix ran against the marker-stripped expected content.
    assert_eq!(
        fs::read_to_string(root.join("Test1Test.java")).unwrap(),
        "class example {}\n"
    );
    // The expected fixture is back byte for byte, marker included.
    assert_eq!(
        fs::read_to_string(root.join("Test1Expected.java")).unwrap(),
        EXPECTED_WITH_MARKER
    );
}

#[test]
fn fix_failure_is_terminal_and_ordered_first() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    write(&root.join("attest.toml"), &fix_and_warn_config());
    // The fixer writes `class example {}` into both; only Good's
    // expected content agrees.
    write(&root.join("BadTest.java"), "whatever\n");
    write(
        &root.join("BadExpected.java"),
        "// ;warn:1:1: Class name in incorrect case\nsomething the fixer never writes\n",
    );
    write(&root.join("GoodTest.java"), "class Example {}\n");
    write(&root.join("GoodExpected.java"), EXPECTED_WITH_MARKER);

    let suites = run_tree(Arc::new(OsFileSystem), root).unwrap();
    let results = &suites[0].results;
    assert_eq!(results.len(), 2);

    // Fix failures come first and keep their content-diff verdict.
    assert!(results[0].unit.test().ends_with("BadTest.java"));
    assert!(matches!(
        results[0].status,
        TestStatus::Fail(FailCause::ContentDiff(_))
    ));
    // The fix-passed unit carries the warn verdict.
    assert!(results[1].unit.test().ends_with("GoodTest.java"));
    assert_eq!(results[1].status, TestStatus::Pass);

    // Markers restored in both expected files either way.
    for name in ["BadExpected.java", "GoodExpected.java"] {
        let content = fs::read_to_string(root.join(name)).unwrap();
        assert!(content.starts_with("// ;warn:1:1:"));
    }
}

#[test]
fn missing_actual_warning_fails_the_joined_unit() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    // Warn half stays silent, so the expected marker goes unmatched.
    let config = format!(
        r#"{GENERAL}
["fix and warn".fix]
exec_flags = "-c 'printf \"class example {{}}\\n\" > \"$0\"'"

["fix and warn".warn]
actual_warnings_pattern = "(.+):(\\d+):(\\d+): (.+)"
exec_flags = "-c 'true'"
"#
    );
    write(&root.join("attest.toml"), &config);
    write(&root.join("Test1Test.java"), "x\n");
    write(&root.join("Test1Expected.java"), EXPECTED_WITH_MARKER);

    let suites = run_tree(Arc::new(OsFileSystem), root).unwrap();
    let result = &suites[0].results[0];
    match &result.status {
        TestStatus::Fail(FailCause::Warnings(m)) => assert_eq!(m.missing.len(), 1),
        other => panic!("expected warning mismatch, got {other:?}"),
    }
}

#[test]
fn warn_never_runs_when_every_fix_unit_fails() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    let sentinel = root.join("warn_ran.txt");
    // The fixer is a no-op, so the content comparison fails; the warn
    // half would leave a trace if it executed anyway.
    let config = format!(
        r#"{GENERAL}
["fix and warn".fix]
exec_flags = "-c 'true'"

["fix and warn".warn]
actual_warnings_pattern = "(.+):(\\d+):(\\d+): (.+)"
exec_flags = "-c 'echo ran >> {sentinel}'"
"#,
        sentinel = sentinel.display()
    );
    write(&root.join("attest.toml"), &config);
    write(&root.join("BadTest.java"), "left as-is\n");
    write(&root.join("BadExpected.java"), EXPECTED_WITH_MARKER);

    let suites = run_tree(Arc::new(OsFileSystem), root).unwrap();
    assert_eq!(suites[0].results.len(), 1);
    assert!(matches!(
        suites[0].results[0].status,
        TestStatus::Fail(FailCause::ContentDiff(_))
    ));
    // No unit passed fix, so the warn command never ran.
    assert!(!sentinel.exists());
    assert_eq!(
        fs::read_to_string(root.join("BadExpected.java")).unwrap(),
        EXPECTED_WITH_MARKER
    );
}

/// Delegates to the real filesystem but fails every write after the
/// first, so the marker strip succeeds and the restore does not.
struct RestoreFailFs {
    inner: OsFileSystem,
    writes: AtomicUsize,
}

impl FileSystem for RestoreFailFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.inner.read_to_string(path)
    }

    fn write_all(&self, path: &Path, contents: &str) -> io::Result<()> {
        if self.writes.fetch_add(1, Ordering::SeqCst) == 0 {
            self.inner.write_all(path, contents)
        } else {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }
    }

    fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.inner.is_file(path)
    }

    fn delete(&self, path: &Path) -> io::Result<()> {
        self.inner.delete(path)
    }

    fn list_directory(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        self.inner.list_directory(path)
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        self.inner.copy(from, to)
    }
}

#[test]
fn restore_failure_fails_units_instead_of_running_warn() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    // Test content already equals the stripped expected content, so
    // the fix half passes and only the restore failure is in play.
    write(&root.join("Test1Test.java"), "class example {}\n");
    write(&root.join("Test1Expected.java"), EXPECTED_WITH_MARKER);

    let config = FixAndWarnConfig {
        warn: WarnConfig {
            actual_warnings_pattern: Some(r"(.+):(\d+):(\d+): (.+)".into()),
            ..WarnConfig::default()
        },
        ..FixAndWarnConfig::default()
    }
    .validate_and_set_defaults(Path::new("attest.toml"))
    .unwrap();

    let fs_impl: Arc<dyn FileSystem> = Arc::new(RestoreFailFs {
        inner: OsFileSystem,
        writes: AtomicUsize::new(0),
    });
    let ctx = PluginContext::new(fs_impl, general(), vec![root.to_path_buf()]);
    let results: Vec<_> = FixAndWarnPlugin::new(ctx, config).execute().collect();

    assert_eq!(results.len(), 1);
    match &results[0].status {
        TestStatus::ExecutionError(message) => {
            assert!(message.contains("restore"));
        }
        other => panic!("expected execution error, got {other:?}"),
    }
}

// ---- MarkerGuard ----

fn general() -> attest_core::config::ResolvedGeneral {
    GeneralConfig {
        exec_cmd: Some("true".into()),
        tags: Some(vec!["t".into()]),
        description: Some("d".into()),
        suite_name: Some("s".into()),
        ..GeneralConfig::default()
    }
    .validate_and_set_defaults(Path::new("attest.toml"))
    .unwrap()
}

#[test]
fn marker_guard_round_trips_bytes_exactly() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("Expected.java");
    // CRLF endings and no trailing newline, both preserved.
    let original = "head\r\n// ;warn:1:1: one\r\nmid\r\n// ;warn:3:3: two\r\ntail";
    write(&path, original);

    let fs_impl: Arc<dyn attest_core::fs::FileSystem> = Arc::new(OsFileSystem);
    let mut guard = MarkerGuard::strip(fs_impl, &general(), &[path.clone()]).unwrap();
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "head\r\nmid\r\ntail"
    );

    guard.restore().unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), original);
}

#[test]
fn marker_guard_restores_on_panic() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("Expected.java");
    write(&path, EXPECTED_WITH_MARKER);

    let result = catch_unwind(AssertUnwindSafe(|| {
        let fs_impl: Arc<dyn attest_core::fs::FileSystem> = Arc::new(OsFileSystem);
        let _guard = MarkerGuard::strip(fs_impl, &general(), &[path.clone()]).unwrap();
        assert_ne!(fs::read_to_string(&path).unwrap(), EXPECTED_WITH_MARKER);
        panic!("mid-run crash");
    }));
    assert!(result.is_err());

    // Drop put the markers back.
    assert_eq!(fs::read_to_string(&path).unwrap(), EXPECTED_WITH_MARKER);
}

#[test]
fn marker_guard_skips_files_without_markers() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("Plain.java");
    let original = "no markers here\n";
    write(&path, original);

    let fs_impl: Arc<dyn attest_core::fs::FileSystem> = Arc::new(OsFileSystem);
    let mut guard = MarkerGuard::strip(fs_impl, &general(), &[path.clone()]).unwrap();
    // Never rewritten, so the mtime-sensitive content is untouched.
    assert_eq!(fs::read_to_string(&path).unwrap(), original);
    guard.restore().unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), original);
}
