//! Running-state checks and graceful stop of the named instance.

use std::sync::Arc;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::process::ProcessRunner;

use super::identity::InstanceState;

/// Result of a successful stop request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopOutcome {
    /// The instance was running and has been stopped.
    Stopped,
    /// The instance was not running; nothing was done.
    AlreadyStopped,
}

/// Controls the single canonical sandbox instance.
#[derive(Clone)]
pub struct InstanceController {
    runner: Arc<dyn ProcessRunner>,
    runtime: String,
    instance_name: String,
}

impl InstanceController {
    /// Creates a controller for `instance_name` using the `runtime` binary.
    pub fn new(
        runner: Arc<dyn ProcessRunner>,
        runtime: impl Into<String>,
        instance_name: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            runtime: runtime.into(),
            instance_name: instance_name.into(),
        }
    }

    /// Returns the instance name this controller addresses.
    pub fn instance_name(&self) -> &str {
        &self.instance_name
    }

    /// Returns true if a container with exactly this name is running.
    ///
    /// The name filter is anchored so the `_script` instance never matches.
    /// Query failures count as not running.
    pub async fn is_running(&self) -> bool {
        let args = vec![
            "ps".to_string(),
            "-q".to_string(),
            "-f".to_string(),
            format!("name=^{}$", self.instance_name),
        ];

        match self.runner.output(&self.runtime, &args).await {
            Ok(output) if output.success() => !output.stdout.trim().is_empty(),
            Ok(output) => {
                tracing::warn!(
                    instance = %self.instance_name,
                    exit_code = ?output.exit_code,
                    stderr = %output.stderr.trim(),
                    "instance query failed, treating instance as stopped"
                );
                false
            }
            Err(e) => {
                tracing::warn!(instance = %self.instance_name, error = %e, "instance query failed, treating instance as stopped");
                false
            }
        }
    }

    /// Returns the current instance state.
    pub async fn state(&self) -> InstanceState {
        InstanceState::from(self.is_running().await)
    }

    /// Gracefully stops the instance if it is running.
    ///
    /// Uses the runtime's default stop timeout and is attempted once.
    pub async fn stop(&self) -> Result<StopOutcome> {
        if !self.is_running().await {
            tracing::debug!(instance = %self.instance_name, "instance not running, nothing to stop");
            return Ok(StopOutcome::AlreadyStopped);
        }

        let args = vec!["stop".to_string(), self.instance_name.clone()];
        let output = self.runner.output(&self.runtime, &args).await.map_err(|e| Error::Stop {
            instance: self.instance_name.clone(),
            reason: e.to_string(),
        })?;

        if !output.success() {
            return Err(Error::Stop {
                instance: self.instance_name.clone(),
                reason: output.stderr.trim().to_string(),
            });
        }

        tracing::info!(instance = %self.instance_name, "instance stopped");
        Ok(StopOutcome::Stopped)
    }
}
