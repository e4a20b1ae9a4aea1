//! Drives a whole config tree: resolve each node, construct its
//! plugins, execute, collect per-suite results.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;

use attest_core::config::{ConfigTree, NodeId, SectionKind};
use attest_core::errors::ConfigError;
use attest_core::fs::FileSystem;
use attest_core::results::TestResult;

use crate::fix::FixPlugin;
use crate::fix_and_warn::FixAndWarnPlugin;
use crate::plugin::{Plugin, PluginContext};
use crate::warn::WarnPlugin;

/// Everything produced by one config node.
#[derive(Debug, Serialize)]
pub struct SuiteResult {
    /// The node's config file path.
    pub location: PathBuf,
    /// Absent when the node resolved no `[general]` (no plugins, or a
    /// resolution error).
    pub suite_name: Option<String>,
    pub results: Vec<TestResult>,
    /// A structural config error. It aborts this node only; sibling
    /// subtrees still run.
    pub error: Option<String>,
}

impl SuiteResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none() && self.results.iter().all(|r| r.status.is_ok())
    }
}

/// Run every suite under `root`, nodes in discovery order.
pub fn run_tree(fs: Arc<dyn FileSystem>, root: &Path) -> Result<Vec<SuiteResult>, ConfigError> {
    let tree = ConfigTree::from_path(&*fs, root)?;
    Ok(tree
        .all_test_configs()
        .into_iter()
        .map(|id| run_node(&tree, id, &fs))
        .collect())
}

/// Like [`run_tree`], executing nodes in parallel. Result order still
/// follows discovery order. Units within a batch share one process
/// invocation and are not independently cancellable.
pub fn run_tree_parallel(
    fs: Arc<dyn FileSystem>,
    root: &Path,
) -> Result<Vec<SuiteResult>, ConfigError> {
    let tree = ConfigTree::from_path(&*fs, root)?;
    Ok(tree
        .all_test_configs()
        .into_par_iter()
        .map(|id| run_node(&tree, id, &fs))
        .collect())
}

/// Process-exit contract: non-zero when any unit is neither Pass nor
/// Ignored, or any node failed to resolve.
pub fn has_failures(suites: &[SuiteResult]) -> bool {
    suites.iter().any(|s| !s.is_ok())
}

fn run_node(tree: &ConfigTree, id: NodeId, fs: &Arc<dyn FileSystem>) -> SuiteResult {
    let location = tree.node(id).location.clone();
    let mut suite = SuiteResult {
        location,
        suite_name: None,
        results: Vec::new(),
        error: None,
    };

    let declares_plugin = [SectionKind::Warn, SectionKind::Fix, SectionKind::FixAndWarn]
        .into_iter()
        .any(|kind| tree.effective_config(id, kind).is_some());
    if !declares_plugin {
        // Structural node; nothing to execute.
        return suite;
    }

    let general = match tree.resolved_general(id) {
        Ok(general) => general,
        Err(e) => {
            tracing::warn!("skipping `{}`: {}", suite.location.display(), e);
            suite.error = Some(e.to_string());
            return suite;
        }
    };
    suite.suite_name = Some(general.suite_name.clone());
    tracing::info!(
        "running suite `{}` from `{}`",
        general.suite_name,
        suite.location.display()
    );
    let ctx = PluginContext::new(fs.clone(), general, tree.resource_directories(id));

    match tree.resolved_warn(id) {
        Ok(Some(config)) => {
            suite
                .results
                .extend(WarnPlugin::new(ctx.clone(), config).execute());
        }
        Ok(None) => {}
        Err(e) => record_error(&mut suite, e),
    }
    match tree.resolved_fix(id) {
        Ok(Some(config)) => {
            suite
                .results
                .extend(FixPlugin::new(ctx.clone(), config).execute());
        }
        Ok(None) => {}
        Err(e) => record_error(&mut suite, e),
    }
    match tree.resolved_fix_and_warn(id) {
        Ok(Some(config)) => {
            suite
                .results
                .extend(FixAndWarnPlugin::new(ctx, config).execute());
        }
        Ok(None) => {}
        Err(e) => record_error(&mut suite, e),
    }
    suite
}

fn record_error(suite: &mut SuiteResult, e: ConfigError) {
    tracing::warn!("plugin skipped in `{}`: {}", suite.location.display(), e);
    match &mut suite.error {
        Some(existing) => {
            existing.push_str("; ");
            existing.push_str(&e.to_string());
        }
        None => suite.error = Some(e.to_string()),
    }
}
