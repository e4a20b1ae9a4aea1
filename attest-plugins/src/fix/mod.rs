//! Fix plugin: runs the tool over test fixtures and checks each one
//! ended up byte-equal (modulo line endings) to its expected partner.

use std::path::{Path, PathBuf};

use attest_core::config::ResolvedFix;
use attest_core::process::ProcessRunner;
use attest_core::results::{DebugInfo, FailCause, TestResult, TestStatus, TestUnit};

use crate::plugin::{build_command, Batches, Discovery, ExtraFlags, Plugin, PluginContext};

/// Differing lines included in a content-diff summary.
const DIFF_SUMMARY_LIMIT: usize = 5;

pub struct FixPlugin {
    ctx: PluginContext,
    config: ResolvedFix,
}

impl FixPlugin {
    pub fn new(ctx: PluginContext, config: ResolvedFix) -> Self {
        Self { ctx, config }
    }

    /// Path of the expected partner: the last occurrence of the test
    /// suffix in the file stem replaced by the expected suffix.
    /// `None` when the stem does not carry the test suffix at all.
    pub fn expected_partner(&self, test: &Path) -> Option<PathBuf> {
        let name = test.file_name()?.to_str()?;
        let (stem, ext) = match name.rsplit_once('.') {
            Some((stem, ext)) => (stem, Some(ext)),
            None => (name, None),
        };
        let idx = stem.rfind(&self.config.resource_name_test)?;
        let mut partner = String::with_capacity(name.len());
        partner.push_str(&stem[..idx]);
        partner.push_str(&self.config.resource_name_expected);
        partner.push_str(&stem[idx + self.config.resource_name_test.len()..]);
        if let Some(ext) = ext {
            partner.push('.');
            partner.push_str(ext);
        }
        Some(test.with_file_name(partner))
    }

    fn is_ignored(&self, path: &Path) -> bool {
        let text = path.to_string_lossy();
        self.config
            .ignore_lines_patterns
            .iter()
            .any(|re| re.is_match(&text))
    }

    pub(crate) fn run_units(
        &self,
        units: Vec<TestUnit>,
    ) -> impl Iterator<Item = TestResult> + '_ {
        let (ignored, active): (Vec<_>, Vec<_>) =
            units.into_iter().partition(|u| self.is_ignored(u.test()));
        let ignored = ignored
            .into_iter()
            .map(|u| TestResult::new(u, TestStatus::Ignored, None));
        let batches = Batches::new(active.into_iter(), self.config.batch_size);
        ignored.chain(batches.flat_map(move |batch| self.run_batch(batch)))
    }

    fn run_batch(&self, batch: Vec<TestUnit>) -> Vec<TestResult> {
        let files: Vec<PathBuf> = batch.iter().map(|u| u.test().to_path_buf()).collect();
        let extra = ExtraFlags::from_fixture(&*self.ctx.fs, &self.ctx.general, &files[0]);
        let command = build_command(
            &self.ctx.general.exec_cmd,
            &self.config.exec_flags,
            &extra,
            &files,
            &self.config.batch_separator,
        );
        tracing::debug!("fix batch: `{command}`");

        let output = match ProcessRunner::run(&command, self.ctx.timeout()) {
            Ok(output) => output,
            Err(e) => {
                let message = e.to_string();
                return batch
                    .into_iter()
                    .map(|u| TestResult::new(u, TestStatus::ExecutionError(message.clone()), None))
                    .collect();
            }
        };

        let debug = DebugInfo {
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code: output.exit_code,
        };
        batch
            .into_iter()
            .map(|unit| self.compare_unit(unit, &debug))
            .collect()
    }

    fn compare_unit(&self, unit: TestUnit, debug: &DebugInfo) -> TestResult {
        let Some(expected_path) = unit.expected() else {
            return TestResult::new(
                unit,
                TestStatus::ExecutionError("fix unit without expected file".into()),
                Some(debug.clone()),
            );
        };
        let read = |path: &Path| {
            self.ctx
                .fs
                .read_to_string(path)
                .map(|c| normalize_endings(&c))
        };
        let (test_content, expected_content) = match (read(unit.test()), read(expected_path)) {
            (Ok(t), Ok(e)) => (t, e),
            (Err(e), _) | (_, Err(e)) => {
                return TestResult::new(
                    unit,
                    TestStatus::ExecutionError(format!("cannot read fixture: {e}")),
                    Some(debug.clone()),
                );
            }
        };
        let status = if test_content == expected_content {
            TestStatus::Pass
        } else {
            TestStatus::Fail(FailCause::ContentDiff(diff_summary(
                &test_content,
                &expected_content,
            )))
        };
        TestResult::new(unit, status, Some(debug.clone()))
    }
}

impl Plugin for FixPlugin {
    fn discover(&self) -> Discovery {
        let mut discovery = Discovery::default();
        for test in self.ctx.candidate_files(&self.config.resource_name_pattern) {
            let Some(expected) = self.expected_partner(&test) else {
                // No partner path can be derived, so the unit is
                // reported against itself.
                discovery.undiscoverable.push(TestResult::new(
                    TestUnit::Fix {
                        test: test.clone(),
                        expected: test,
                    },
                    TestStatus::ExecutionError(format!(
                        "file name lacks the `{}` suffix needed to derive its expected pair",
                        self.config.resource_name_test
                    )),
                    None,
                ));
                continue;
            };
            if self.ctx.fs.is_file(&expected) {
                discovery.units.push(TestUnit::Fix { test, expected });
            } else {
                // Never reaches process execution.
                discovery.undiscoverable.push(TestResult::new(
                    TestUnit::Fix {
                        test,
                        expected: expected.clone(),
                    },
                    TestStatus::ExecutionError(format!(
                        "expected file not found: {}",
                        expected.display()
                    )),
                    None,
                ));
            }
        }
        discovery
    }

    fn execute(&self) -> Box<dyn Iterator<Item = TestResult> + '_> {
        let Discovery {
            units,
            undiscoverable,
        } = self.discover();
        Box::new(undiscoverable.into_iter().chain(self.run_units(units)))
    }
}

fn normalize_endings(content: &str) -> String {
    content.replace("\r\n", "\n")
}

/// First few differing lines, both sides, plus a trailing-length note.
fn diff_summary(test: &str, expected: &str) -> String {
    let test_lines: Vec<&str> = test.lines().collect();
    let expected_lines: Vec<&str> = expected.lines().collect();
    let mut parts = Vec::new();
    let mut shown = 0usize;
    for (i, (t, e)) in test_lines.iter().zip(expected_lines.iter()).enumerate() {
        if t != e {
            parts.push(format!("line {}: `{}` != `{}`", i + 1, t, e));
            shown += 1;
            if shown == DIFF_SUMMARY_LIMIT {
                parts.push("...".to_string());
                break;
            }
        }
    }
    if test_lines.len() != expected_lines.len() {
        parts.push(format!(
            "{} lines vs {} expected",
            test_lines.len(),
            expected_lines.len()
        ));
    }
    parts.join("; ")
}
