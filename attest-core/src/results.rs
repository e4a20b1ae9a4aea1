//! Test units, verdicts, and results handed to external reporters.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// A discovered unit of testing. Immutable after discovery.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum TestUnit {
    /// A single fixture whose diagnostics are compared against markers.
    Warn { test: PathBuf },
    /// A fixture paired with its expected post-fix counterpart.
    Fix { test: PathBuf, expected: PathBuf },
}

impl TestUnit {
    pub fn test(&self) -> &Path {
        match self {
            Self::Warn { test } | Self::Fix { test, .. } => test,
        }
    }

    pub fn expected(&self) -> Option<&Path> {
        match self {
            Self::Warn { .. } => None,
            Self::Fix { expected, .. } => Some(expected),
        }
    }
}

/// One diagnostic, expected (from a fixture marker) or actual (from tool
/// output). `line`/`column` are absent when the configured pattern does
/// not carry them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Warning {
    pub file: Option<String>,
    pub line: Option<usize>,
    pub column: Option<usize>,
    pub message: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.line, self.column) {
            (Some(l), Some(c)) => write!(f, "{}:{}: {}", l, c, self.message),
            (Some(l), None) => write!(f, "{}: {}", l, self.message),
            _ => write!(f, "{}", self.message),
        }
    }
}

/// An expected/actual pair that matched on `(line, column)` but disagreed
/// on message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MismatchedPair {
    pub expected: Warning,
    pub actual: Warning,
}

/// Structured discrepancies from warning reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WarningMismatch {
    /// Expected warnings with no matching actual warning.
    pub missing: Vec<Warning>,
    /// Actual warnings with no matching expected warning.
    pub extra: Vec<Warning>,
    /// Pairs that matched positionally but not textually.
    pub mismatched: Vec<MismatchedPair>,
}

impl WarningMismatch {
    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty() && self.mismatched.is_empty()
    }
}

impl fmt::Display for WarningMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} missing, {} extra, {} mismatched",
            self.missing.len(),
            self.extra.len(),
            self.mismatched.len()
        )
    }
}

/// Why a unit failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FailCause {
    /// Warn comparison found discrepancies.
    Warnings(WarningMismatch),
    /// Fix comparison found differing content; carries a diff summary.
    ContentDiff(String),
}

impl fmt::Display for FailCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warnings(m) => write!(f, "warning mismatch: {m}"),
            Self::ContentDiff(d) => write!(f, "content mismatch: {d}"),
        }
    }
}

/// Terminal status of a test unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TestStatus {
    Pass,
    Fail(FailCause),
    Ignored,
    ExecutionError(String),
}

impl TestStatus {
    /// Pass and Ignored do not contribute to a nonzero process exit.
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Pass | Self::Ignored)
    }
}

/// Raw process output attached to a result for debugging.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DebugInfo {
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
    pub exit_code: Option<i32>,
}

/// The outcome of one test unit. Immutable; consumed by reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestResult {
    pub unit: TestUnit,
    pub status: TestStatus,
    pub debug_info: Option<DebugInfo>,
}

impl TestResult {
    pub fn new(unit: TestUnit, status: TestStatus, debug_info: Option<DebugInfo>) -> Self {
        Self {
            unit,
            status,
            debug_info,
        }
    }
}
