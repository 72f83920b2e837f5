//! Sandbox image and instance management.
//!
//! [`SandboxManager`] drives the lifecycle commands on top of an
//! [`ImageManager`] and an [`InstanceController`], both of which talk to the
//! container runtime through a [`ProcessRunner`](crate::process::ProcessRunner).

mod identity;
mod image;
mod instance;
mod manager;

pub use identity::{
    ImageState, InstanceState, SandboxIdentity, VolumeMount, CONTAINER_DATA_PATH,
    CONTAINER_SCRIPTS_PATH,
};
pub use image::ImageManager;
pub use instance::{InstanceController, StopOutcome};
pub use manager::{SandboxManager, SandboxStatus, StopReport};
