//! # attest-plugins
//!
//! Execution engine for the Attest test framework. Implements the
//! warn, fix, and fix-and-warn plugins over the configuration and
//! result types from `attest-core`, plus the runner that drives a
//! whole config tree.

pub mod fix;
pub mod fix_and_warn;
pub mod plugin;
pub mod runner;
pub mod warn;

pub use fix::FixPlugin;
pub use fix_and_warn::{FixAndWarnPlugin, MarkerGuard};
pub use plugin::{build_command, Batches, Discovery, ExtraFlags, Plugin, PluginContext};
pub use runner::{has_failures, run_tree, run_tree_parallel, SuiteResult};
pub use warn::WarnPlugin;
