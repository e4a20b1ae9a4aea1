//! Execution-layer errors.
//!
//! These are per-batch or per-unit: they surface as terminal
//! `ExecutionError` test results and never abort the run.

use std::path::PathBuf;

use super::error_code::{self, AttestErrorCode};

/// Errors raised while running the analyzer command or touching fixtures.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("failed to spawn `{command}`: {message}")]
    Spawn { command: String, message: String },

    #[error("process timed out after {millis} ms: `{command}`")]
    Timeout { command: String, millis: u64 },

    #[error("failed to wait for `{command}`: {message}")]
    Wait { command: String, message: String },

    #[error("i/o error on `{}`: {message}", .path.display())]
    Io { path: PathBuf, message: String },
}

impl PluginError {
    /// Wrap an `io::Error` with the path it occurred on.
    pub fn io(path: &std::path::Path, err: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}

impl AttestErrorCode for PluginError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Spawn { .. } => error_code::PROCESS_SPAWN,
            Self::Timeout { .. } => error_code::PROCESS_TIMEOUT,
            Self::Wait { .. } => error_code::PROCESS_WAIT,
            Self::Io { .. } => error_code::PLUGIN_IO,
        }
    }
}
