//! External command execution.
//!
//! Everything that talks to the container runtime goes through the
//! [`ProcessRunner`] trait so the lifecycle logic can be exercised without a
//! real runtime installed.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{Error, Result};

/// Captured result of a command that ran to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Exit code, `None` if the process was terminated by a signal.
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    /// Returns true if the command exited with status zero.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// How an attached (foreground) command finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The process exited on its own.
    Exited(Option<i32>),
    /// An interrupt arrived while waiting for the process.
    Interrupted,
}

impl RunOutcome {
    /// Returns true if the process exited with status zero.
    pub fn success(&self) -> bool {
        matches!(self, RunOutcome::Exited(Some(0)))
    }
}

/// Runs external programs on behalf of the sandbox.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Runs the program to completion, capturing its output.
    async fn output(&self, program: &str, args: &[String]) -> Result<CommandOutput>;

    /// Runs the program attached to the current terminal and waits for it.
    ///
    /// An interrupt received during the wait yields [`RunOutcome::Interrupted`]
    /// rather than an error.
    async fn run_attached(&self, program: &str, args: &[String]) -> Result<RunOutcome>;
}

/// Runner that spawns real processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    /// Creates a new system runner.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessRunner for SystemRunner {
    async fn output(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        tracing::debug!(program = %program, args = ?args, "running command");

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| Error::Spawn {
                program: program.to_string(),
                source: e,
            })?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
        })
    }

    async fn run_attached(&self, program: &str, args: &[String]) -> Result<RunOutcome> {
        tracing::debug!(program = %program, args = ?args, "running attached command");

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| Error::Spawn {
                program: program.to_string(),
                source: e,
            })?;

        tokio::select! {
            status = child.wait() => {
                let status = status?;
                Ok(RunOutcome::Exited(status.code()))
            }
            _ = tokio::signal::ctrl_c() => {
                // The child got the same signal; reap it.
                tracing::info!(program = %program, "interrupted, waiting for child to exit");
                if let Err(e) = child.wait().await {
                    tracing::warn!(error = %e, "failed to reap interrupted child");
                }
                Ok(RunOutcome::Interrupted)
            }
        }
    }
}
