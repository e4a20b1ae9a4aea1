//! Warn plugin: runs the tool on fixtures annotated with expected
//! warnings and reconciles the tool's diagnostics against them.

pub mod comparator;

use std::path::{Path, PathBuf};

use attest_core::config::ResolvedWarn;
use attest_core::process::ProcessRunner;
use attest_core::results::{
    DebugInfo, FailCause, TestResult, TestStatus, TestUnit, Warning, WarningMismatch,
};

use crate::plugin::{build_command, Batches, Discovery, ExtraFlags, Plugin, PluginContext};

pub struct WarnPlugin {
    ctx: PluginContext,
    config: ResolvedWarn,
}

impl WarnPlugin {
    pub fn new(ctx: PluginContext, config: ResolvedWarn) -> Self {
        Self { ctx, config }
    }

    fn is_ignored(&self, path: &Path) -> bool {
        let text = path.to_string_lossy();
        self.config
            .ignore_lines_patterns
            .iter()
            .any(|re| re.is_match(&text))
    }

    /// Execute already-discovered units, batch by batch.
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
        tracing::debug!("warn batch: `{command}`");

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

        let all_actual = comparator::actual_warnings(&self.config, output.all_lines());
        let debug = DebugInfo {
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code: output.exit_code,
        };
        batch
            .into_iter()
            .map(|unit| self.compare_unit(unit, &all_actual, &debug))
            .collect()
    }

    fn compare_unit(
        &self,
        unit: TestUnit,
        all_actual: &[Warning],
        debug: &DebugInfo,
    ) -> TestResult {
        let lines = match self.ctx.fs.read_lines(unit.test()) {
            Ok(lines) => lines,
            Err(e) => {
                return TestResult::new(
                    unit,
                    TestStatus::ExecutionError(format!("cannot read fixture: {e}")),
                    Some(debug.clone()),
                );
            }
        };
        let expected = comparator::expected_warnings(&self.ctx.general, &self.config, &lines);
        let unit_name = unit
            .test()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let actual = comparator::warnings_for_unit(all_actual, &unit_name);
        let mismatch = comparator::reconcile(&expected, &actual, &self.config);
        let status = if mismatch.is_empty() {
            TestStatus::Pass
        } else {
            self.verdict(mismatch)
        };
        TestResult::new(unit, status, Some(debug.clone()))
    }

    /// Mismatched pairs always fail; missing and extra warnings fail
    /// only when their flags say so.
    fn verdict(&self, mismatch: WarningMismatch) -> TestStatus {
        let fails = !mismatch.mismatched.is_empty()
            || (self.config.missing_warnings_fail && !mismatch.missing.is_empty())
            || (self.config.extra_warnings_fail && !mismatch.extra.is_empty());
        if fails {
            TestStatus::Fail(FailCause::Warnings(mismatch))
        } else {
            TestStatus::Pass
        }
    }
}

impl Plugin for WarnPlugin {
    fn discover(&self) -> Discovery {
        Discovery {
            units: self
                .ctx
                .candidate_files(&self.config.resource_name_pattern)
                .into_iter()
                .map(|test| TestUnit::Warn { test })
                .collect(),
            undiscoverable: Vec::new(),
        }
    }

    fn execute(&self) -> Box<dyn Iterator<Item = TestResult> + '_> {
        let Discovery {
            units,
            undiscoverable,
        } = self.discover();
        Box::new(undiscoverable.into_iter().chain(self.run_units(units)))
    }
}
