//! # attest-core
//!
//! Foundation crate for the Attest test framework.
//! Defines configuration discovery and resolution, filesystem and
//! process abstractions, result types, and errors. The plugin crate
//! builds its execution logic on top of this.

pub mod config;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod process;
pub mod results;

// Re-export the most commonly used types at the crate root.
pub use config::{ConfigTree, ResolvedFix, ResolvedFixAndWarn, ResolvedGeneral, ResolvedWarn};
pub use errors::{AttestErrorCode, ConfigError, PluginError};
pub use fs::{FileSystem, OsFileSystem};
pub use process::{ExecutionOutput, ProcessRunner};
pub use results::{TestResult, TestStatus, TestUnit, Warning, WarningMismatch};
