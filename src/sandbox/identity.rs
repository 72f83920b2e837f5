//! Identity, mounts and derived state of the managed sandbox.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::config::SandboxConfig;
use crate::layout::LayoutPaths;

/// Container path where persistent data is mounted.
pub const CONTAINER_DATA_PATH: &str = "/app/persistent";

/// Container path where user scripts are mounted.
pub const CONTAINER_SCRIPTS_PATH: &str = "/app/user_scripts";

/// Suffix appended to the instance name for one-shot script runs.
const SCRIPT_INSTANCE_SUFFIX: &str = "_script";

/// Names that address the sandbox image and its instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SandboxIdentity {
    pub instance_name: String,
    pub image_name: String,
}

impl SandboxIdentity {
    /// Creates an identity from an instance name and a full image reference.
    pub fn new(instance_name: impl Into<String>, image_name: impl Into<String>) -> Self {
        Self {
            instance_name: instance_name.into(),
            image_name: image_name.into(),
        }
    }

    /// Derives the identity from configuration.
    pub fn from_config(config: &SandboxConfig) -> Self {
        Self::new(config.instance_name.clone(), config.image_name())
    }

    /// Instance name used for script runs, distinct from the interactive one.
    pub fn script_instance_name(&self) -> String {
        format!("{}{}", self.instance_name, SCRIPT_INSTANCE_SUFFIX)
    }
}

impl Default for SandboxIdentity {
    fn default() -> Self {
        Self::from_config(&SandboxConfig::default())
    }
}

/// A read-write bind of a host directory into the instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumeMount {
    pub host_path: PathBuf,
    pub container_path: &'static str,
}

impl VolumeMount {
    /// Returns the mount for the persistent-data directory.
    pub fn data(host_path: PathBuf) -> Self {
        Self {
            host_path,
            container_path: CONTAINER_DATA_PATH,
        }
    }

    /// Returns the mount for the user-scripts directory.
    pub fn scripts(host_path: PathBuf) -> Self {
        Self {
            host_path,
            container_path: CONTAINER_SCRIPTS_PATH,
        }
    }

    /// Both mounts for an ensured layout, data first.
    pub fn for_layout(paths: &LayoutPaths) -> [VolumeMount; 2] {
        [
            Self::data(paths.data_dir.clone()),
            Self::scripts(paths.scripts_dir.clone()),
        ]
    }

    /// Renders the `-v` argument value.
    pub fn to_arg(&self) -> String {
        format!("{}:{}", self.host_path.display(), self.container_path)
    }
}

/// Whether the sandbox image exists locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageState {
    Present,
    Absent,
}

impl From<bool> for ImageState {
    fn from(present: bool) -> Self {
        if present {
            ImageState::Present
        } else {
            ImageState::Absent
        }
    }
}

impl fmt::Display for ImageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageState::Present => write!(f, "present"),
            ImageState::Absent => write!(f, "absent"),
        }
    }
}

/// Whether the named instance is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceState {
    Running,
    Stopped,
}

impl From<bool> for InstanceState {
    fn from(running: bool) -> Self {
        if running {
            InstanceState::Running
        } else {
            InstanceState::Stopped
        }
    }
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstanceState::Running => write!(f, "running"),
            InstanceState::Stopped => write!(f, "stopped"),
        }
    }
}
