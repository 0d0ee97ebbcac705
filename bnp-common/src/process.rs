//! Subprocess boundary for helper scripts
//!
//! Business logic depends only on `CommandRunner`; the tokio implementation
//! is the single place that spawns processes.

use crate::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Captured result of a finished command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code (-1 when terminated by a signal)
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs an external command with a bounded timeout
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `args[0]` with the remaining arguments
    ///
    /// Fails with `Unavailable` when the command cannot be started or exceeds `timeout`.
    async fn run(&self, args: &[String], timeout: Duration) -> Result<CommandOutput>;
}

/// `CommandRunner` backed by `tokio::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioCommandRunner;

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(&self, args: &[String], timeout: Duration) -> Result<CommandOutput> {
        let (program, rest) = args
            .split_first()
            .ok_or_else(|| Error::InvalidInput("Empty command".to_string()))?;

        debug!(program = %program, args = ?rest, "Running command");

        let child = Command::new(program)
            .args(rest)
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(timeout, child)
            .await
            .map_err(|_| Error::Unavailable(format!("{} timed out after {:?}", program, timeout)))?
            .map_err(|e| Error::Unavailable(format!("Failed to run {}: {}", program, e)))?;

        Ok(CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
