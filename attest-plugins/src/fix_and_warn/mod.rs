//! Fix-and-warn plugin: one fix pass and one warn pass over the same
//! fixture pairs.
//!
//! Expected fixtures carry warning markers that the fix comparison
//! must not see, so the run brackets the fix pass with a marker strip
//! and restore. Restoration is guaranteed by a scoped guard; even a
//! panic mid-run leaves the fixtures as they were.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use regex::Regex;
use rustc_hash::FxHashMap;

use attest_core::config::{ResolvedFixAndWarn, ResolvedGeneral};
use attest_core::errors::PluginError;
use attest_core::fs::FileSystem;
use attest_core::results::{TestResult, TestStatus};

use crate::fix::FixPlugin;
use crate::plugin::{Discovery, Plugin, PluginContext};
use crate::warn::WarnPlugin;

pub struct FixAndWarnPlugin {
    ctx: PluginContext,
    config: ResolvedFixAndWarn,
}

impl FixAndWarnPlugin {
    pub fn new(ctx: PluginContext, config: ResolvedFixAndWarn) -> Self {
        Self { ctx, config }
    }

    fn run(&self) -> Vec<TestResult> {
        let fix_plugin = FixPlugin::new(self.ctx.clone(), self.config.fix.clone());
        let Discovery {
            units,
            undiscoverable,
        } = fix_plugin.discover();

        let expected_files: Vec<PathBuf> = units
            .iter()
            .filter_map(|u| u.expected().map(Path::to_path_buf))
            .collect();
        let mut guard =
            match MarkerGuard::strip(self.ctx.fs.clone(), &self.ctx.general, &expected_files) {
                Ok(guard) => guard,
                Err(e) => {
                    let message = e.to_string();
                    return undiscoverable
                        .into_iter()
                        .chain(units.into_iter().map(|u| {
                            TestResult::new(u, TestStatus::ExecutionError(message.clone()), None)
                        }))
                        .collect();
                }
            };

        // The fix comparison must see the stripped expected files, so
        // results are materialized before the guard restores them.
        let fix_results: Vec<TestResult> = fix_plugin.run_units(units).collect();
        if let Err(e) = guard.restore() {
            // Warn verdicts computed against still-stripped fixtures
            // would be wrong; fail every unit instead of proceeding.
            let message = format!("failed to restore expected-warning markers: {e}");
            tracing::warn!("{}", message);
            return undiscoverable
                .into_iter()
                .chain(fix_results.into_iter().map(|r| {
                    TestResult::new(
                        r.unit,
                        TestStatus::ExecutionError(message.clone()),
                        r.debug_info,
                    )
                }))
                .collect();
        }

        let passed_expected: Vec<PathBuf> = fix_results
            .iter()
            .filter(|r| r.status == TestStatus::Pass)
            .filter_map(|r| r.unit.expected().map(Path::to_path_buf))
            .collect();
        // Zero fix-passed units means zero warn invocations; handing
        // the warn plugin an empty candidate list would instead fall
        // back to full discovery over the test fixtures.
        let mut warn_by_path: FxHashMap<PathBuf, TestResult> = FxHashMap::default();
        if !passed_expected.is_empty() {
            let warn_plugin = WarnPlugin::new(
                self.ctx.clone().with_candidates(passed_expected),
                self.config.warn.clone(),
            );
            warn_by_path = warn_plugin
                .execute()
                .map(|r| (r.unit.test().to_path_buf(), r))
                .collect();
        }

        // Fix failures come back first, then the warn verdict of every
        // fix-passed unit, attributed to the original pair.
        let mut out: Vec<TestResult> = undiscoverable;
        let mut passed: Vec<TestResult> = Vec::new();
        for fix_result in fix_results {
            if fix_result.status != TestStatus::Pass {
                out.push(fix_result);
                continue;
            }
            let joined = fix_result
                .unit
                .expected()
                .and_then(|expected| warn_by_path.remove(expected));
            match joined {
                Some(warn_result) => passed.push(TestResult::new(
                    fix_result.unit,
                    warn_result.status,
                    warn_result.debug_info,
                )),
                None => passed.push(fix_result),
            }
        }
        out.extend(passed);
        out
    }
}

impl Plugin for FixAndWarnPlugin {
    fn discover(&self) -> Discovery {
        FixPlugin::new(self.ctx.clone(), self.config.fix.clone()).discover()
    }

    /// Materialized rather than lazy: fixtures are mutated while the
    /// fix pass runs, and the mutation window must close before
    /// results are handed out.
    fn execute(&self) -> Box<dyn Iterator<Item = TestResult> + '_> {
        Box::new(self.run().into_iter())
    }
}

/// Scoped removal of expected-warning marker lines.
///
/// `strip` rewrites each file without its marker lines, remembering
/// the removed lines and their original indices. `restore` puts them
/// back byte for byte; `Drop` is the backstop when `restore` was not
/// reached.
pub struct MarkerGuard {
    fs: Arc<dyn FileSystem>,
    stripped: Vec<(PathBuf, Vec<(usize, String)>)>,
    restored: bool,
}

impl MarkerGuard {
    pub fn strip(
        fs: Arc<dyn FileSystem>,
        general: &ResolvedGeneral,
        files: &[PathBuf],
    ) -> Result<Self, PluginError> {
        let matchers: Vec<&Regex> = [
            Some(&general.expected_warnings_pattern),
            general.expected_warnings_middle_pattern.as_ref(),
            general.expected_warnings_end_pattern.as_ref(),
        ]
        .into_iter()
        .flatten()
        .collect();

        let mut stripped = Vec::new();
        for path in files {
            let content = fs.read_to_string(path).map_err(|e| PluginError::io(path, e))?;
            // split('\n') round-trips exactly, trailing newline and \r
            // included, unlike lines().
            let pieces: Vec<&str> = content.split('\n').collect();
            let mut kept: Vec<&str> = Vec::with_capacity(pieces.len());
            let mut removed: Vec<(usize, String)> = Vec::new();
            for (i, piece) in pieces.iter().enumerate() {
                if matchers.iter().any(|re| re.is_match(piece)) {
                    removed.push((i, (*piece).to_string()));
                } else {
                    kept.push(piece);
                }
            }
            if removed.is_empty() {
                continue;
            }
            fs.write_all(path, &kept.join("\n"))
                .map_err(|e| PluginError::io(path, e))?;
            stripped.push((path.clone(), removed));
        }
        Ok(Self {
            fs,
            stripped,
            restored: false,
        })
    }

    /// Reinsert every stripped marker line at its original index.
    pub fn restore(&mut self) -> Result<(), PluginError> {
        if self.restored {
            return Ok(());
        }
        self.restored = true;

        let mut first_err: Option<PluginError> = None;
        for (path, removed) in &self.stripped {
            let result = (|| -> Result<(), PluginError> {
                let content = self
                    .fs
                    .read_to_string(path)
                    .map_err(|e| PluginError::io(path, e))?;
                let mut pieces: Vec<String> =
                    content.split('\n').map(str::to_owned).collect();
                // Indices are original positions; inserting in
                // ascending order keeps them valid.
                for (index, line) in removed {
                    let at = (*index).min(pieces.len());
                    pieces.insert(at, line.clone());
                }
                self.fs
                    .write_all(path, &pieces.join("\n"))
                    .map_err(|e| PluginError::io(path, e))
            })();
            if let Err(e) = result {
                tracing::warn!("marker restore failed for `{}`: {}", path.display(), e);
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Drop for MarkerGuard {
    fn drop(&mut self) {
        if !self.restored {
            let _ = self.restore();
        }
    }
}
