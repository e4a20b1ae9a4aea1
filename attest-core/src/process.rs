//! External process execution with timeout.
//!
//! The analyzer command is a shell-style string; it runs under `sh -c`
//! with the batch's file paths already appended by the caller. A nonzero
//! exit code is not a failure signal (analyzers commonly exit nonzero
//! when they emit diagnostics); only comparison drives verdicts.

use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use crate::errors::PluginError;

/// How often the runner polls a child that has not exited yet.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Captured output of one batch invocation.
#[derive(Debug, Clone, Default)]
pub struct ExecutionOutput {
    pub exit_code: Option<i32>,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
}

impl ExecutionOutput {
    /// stdout followed by stderr, as one line stream.
    pub fn all_lines(&self) -> impl Iterator<Item = &str> {
        self.stdout
            .iter()
            .chain(self.stderr.iter())
            .map(String::as_str)
    }
}

/// Spawns analyzer commands and enforces the configured timeout.
pub struct ProcessRunner;

impl ProcessRunner {
    /// Run `command` under `sh -c`, waiting at most `timeout`.
    ///
    /// On timeout the child is killed and `PluginError::Timeout` is
    /// returned; the caller maps that onto the batch's units.
    pub fn run(command: &str, timeout: Duration) -> Result<ExecutionOutput, PluginError> {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| PluginError::Spawn {
                command: command.to_string(),
                message: e.to_string(),
            })?;

        let start = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(_)) => {
                    let output = child.wait_with_output().map_err(|e| PluginError::Wait {
                        command: command.to_string(),
                        message: e.to_string(),
                    })?;
                    return Ok(ExecutionOutput {
                        exit_code: output.status.code(),
                        stdout: split_lines(&output.stdout),
                        stderr: split_lines(&output.stderr),
                    });
                }
                Ok(None) => {
                    if start.elapsed() >= timeout {
                        tracing::warn!(
                            "killing `{}` after {} ms timeout",
                            command,
                            timeout.as_millis()
                        );
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(PluginError::Timeout {
                            command: command.to_string(),
                            millis: timeout.as_millis() as u64,
                        });
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
                Err(e) => {
                    return Err(PluginError::Wait {
                        command: command.to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }
    }
}

fn split_lines(bytes: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(str::to_owned)
        .collect()
}
