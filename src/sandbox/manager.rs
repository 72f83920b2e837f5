//! Sandbox lifecycle manager.
//!
//! Every command derives image and instance state by querying the runtime
//! at the moment it runs. Nothing is cached between commands.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::config::SandboxConfig;
use crate::error::{Error, Result, INTERRUPTED_EXIT_CODE};
use crate::layout::{LayoutPaths, SandboxLayout};
use crate::process::{ProcessRunner, RunOutcome};
use crate::templates::{self, EXAMPLE_SCRIPT_NAME};

use super::identity::{ImageState, InstanceState, SandboxIdentity, VolumeMount};
use super::image::ImageManager;
use super::instance::{InstanceController, StopOutcome};

/// Argument selecting the interactive entry-point mode.
const MODE_INTERACTIVE: &str = "interactive";

/// Argument selecting the script entry-point mode.
const MODE_SCRIPT: &str = "script";

/// Snapshot reported by `status`.
#[derive(Debug, Clone, Serialize)]
pub struct SandboxStatus {
    pub image: String,
    pub image_state: ImageState,
    pub instance: String,
    pub instance_state: InstanceState,
    pub data_dir: PathBuf,
    pub scripts_dir: PathBuf,
    pub scripts: Vec<String>,
    /// Set when the scripts directory could not be listed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scripts_error: Option<String>,
}

impl fmt::Display for SandboxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Sandbox status:")?;
        writeln!(f, "  Image:       {} ({})", self.image, self.image_state)?;
        writeln!(f, "  Instance:    {} ({})", self.instance, self.instance_state)?;
        writeln!(f, "  Data dir:    {}", self.data_dir.display())?;
        writeln!(f, "  Scripts dir: {}", self.scripts_dir.display())?;

        if let Some(err) = &self.scripts_error {
            write!(f, "  Scripts:     unavailable ({})", err)
        } else if self.scripts.is_empty() {
            write!(f, "  Scripts:     none")
        } else {
            write!(f, "  Scripts ({}):", self.scripts.len())?;
            for script in &self.scripts {
                write!(f, "\n    - {}", script)?;
            }
            Ok(())
        }
    }
}

/// What `stop` reports to the user. A failed stop is a warning, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopReport {
    pub instance: String,
    /// `None` when the stop request failed.
    pub outcome: Option<StopOutcome>,
    pub instance_state: InstanceState,
    pub warning: Option<String>,
}

impl fmt::Display for StopReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.outcome {
            Some(StopOutcome::Stopped) => write!(f, "Instance {} stopped", self.instance),
            Some(StopOutcome::AlreadyStopped) => {
                write!(f, "Instance {} is not running", self.instance)
            }
            None => write!(f, "Instance {} is {}", self.instance, self.instance_state),
        }
    }
}

/// Orchestrates layout, image and instance for each sandbox command.
pub struct SandboxManager {
    runner: Arc<dyn ProcessRunner>,
    runtime: String,
    identity: SandboxIdentity,
    layout: SandboxLayout,
    build_context: PathBuf,
    images: ImageManager,
    instance: InstanceController,
}

impl SandboxManager {
    /// Creates a manager for the sandbox rooted at `layout`.
    pub fn new(
        config: &SandboxConfig,
        layout: SandboxLayout,
        runner: Arc<dyn ProcessRunner>,
    ) -> Self {
        let identity = SandboxIdentity::from_config(config);
        let build_context = config.build_context_dir(layout.root());
        let images = ImageManager::new(runner.clone(), &config.runtime, &identity.image_name);
        let instance =
            InstanceController::new(runner.clone(), &config.runtime, &identity.instance_name);

        Self {
            runner,
            runtime: config.runtime.clone(),
            identity,
            layout,
            build_context,
            images,
            instance,
        }
    }

    /// Returns the identity of the managed sandbox.
    pub fn identity(&self) -> &SandboxIdentity {
        &self.identity
    }

    /// Returns the host layout.
    pub fn layout(&self) -> &SandboxLayout {
        &self.layout
    }

    /// Reports image, instance and script state without side effects.
    pub async fn status(&self) -> SandboxStatus {
        let image_state = self.images.state().await;
        let instance_state = self.instance.state().await;

        let (scripts, scripts_error) = match self.layout.list_scripts() {
            Ok(scripts) => (scripts, None),
            Err(e) => {
                tracing::warn!(error = %e, "failed to list scripts");
                (Vec::new(), Some(e.to_string()))
            }
        };

        SandboxStatus {
            image: self.identity.image_name.clone(),
            image_state,
            instance: self.identity.instance_name.clone(),
            instance_state,
            data_dir: self.layout.data_dir(),
            scripts_dir: self.layout.scripts_dir(),
            scripts,
            scripts_error,
        }
    }

    /// Builds the image unconditionally.
    pub async fn build(&self) -> Result<()> {
        self.images.build(&self.build_context).await
    }

    /// Builds the image only if it is not present. Returns true if a build ran.
    pub async fn ensure_image(&self) -> Result<bool> {
        if self.images.exists().await {
            return Ok(false);
        }

        tracing::info!(image = %self.identity.image_name, "image not found, building");
        self.images.build(&self.build_context).await?;
        Ok(true)
    }

    /// Starts an attached interactive session and blocks until it ends.
    ///
    /// An interrupt during the session counts as a normal exit. A name
    /// collision with an already running instance is reported by the runtime
    /// and surfaced as [`Error::ContainerExit`].
    pub async fn interactive(&self) -> Result<()> {
        let paths = self.layout.ensure()?;
        self.ensure_image().await?;

        let args = self.run_args(
            &paths,
            &["-it", "--rm", "--name", self.identity.instance_name.as_str()],
            &[MODE_INTERACTIVE],
        );

        tracing::info!(instance = %self.identity.instance_name, "starting interactive session");
        match self.runner.run_attached(&self.runtime, &args).await? {
            RunOutcome::Exited(Some(0)) => Ok(()),
            RunOutcome::Interrupted => {
                tracing::info!("interactive session interrupted");
                Ok(())
            }
            RunOutcome::Exited(exit_code) => Err(Error::ContainerExit { exit_code }),
        }
    }

    /// Runs `name` from the scripts directory in an ephemeral instance.
    ///
    /// The script is resolved before the runtime is touched. Its exit code
    /// is propagated exactly through [`Error::ScriptExecution`].
    pub async fn run_script(&self, name: &str) -> Result<()> {
        let paths = self.layout.ensure()?;
        let script = self.layout.resolve_script(name)?;
        self.ensure_image().await?;

        let instance_name = self.identity.script_instance_name();
        let args = self.run_args(
            &paths,
            &["--rm", "--name", instance_name.as_str()],
            &[MODE_SCRIPT, script.name.as_str()],
        );

        tracing::info!(script = %script.name, instance = %instance_name, "running script");
        match self.runner.run_attached(&self.runtime, &args).await? {
            RunOutcome::Exited(Some(0)) => Ok(()),
            RunOutcome::Exited(exit_code) => Err(Error::ScriptExecution {
                script: script.name,
                exit_code,
            }),
            RunOutcome::Interrupted => Err(Error::ScriptExecution {
                script: script.name,
                exit_code: Some(INTERRUPTED_EXIT_CODE),
            }),
        }
    }

    /// Stops the interactive instance if it is running.
    pub async fn stop(&self) -> Result<StopOutcome> {
        self.instance.stop().await
    }

    /// Stops the instance and reports the final state without failing.
    ///
    /// On a failed stop the state is queried again so the report shows
    /// whether the instance is still running.
    pub async fn stop_report(&self) -> StopReport {
        let (outcome, warning) = match self.instance.stop().await {
            Ok(outcome) => (Some(outcome), None),
            Err(e) => {
                tracing::warn!(error = %e, "stop failed");
                (None, Some(e.to_string()))
            }
        };

        let instance_state = match outcome {
            Some(_) => InstanceState::Stopped,
            None => self.instance.state().await,
        };

        StopReport {
            instance: self.identity.instance_name.clone(),
            outcome,
            instance_state,
            warning,
        }
    }

    /// Returns the current state of the interactive instance.
    pub async fn instance_state(&self) -> InstanceState {
        self.instance.state().await
    }

    /// Writes the fixed example script and returns its path.
    pub fn create_example(&self) -> Result<PathBuf> {
        let path = self
            .layout
            .write_script(EXAMPLE_SCRIPT_NAME, templates::example_script())?;
        tracing::info!(path = ?path, "example script created");
        Ok(path)
    }

    fn run_args(&self, paths: &LayoutPaths, flags: &[&str], mode: &[&str]) -> Vec<String> {
        let mut args = vec!["run".to_string()];
        args.extend(flags.iter().map(|f| f.to_string()));

        for mount in VolumeMount::for_layout(paths) {
            args.push("-v".to_string());
            args.push(mount.to_arg());
        }

        args.push(self.identity.image_name.clone());
        args.extend(mode.iter().map(|m| m.to_string()));
        args
    }
}
