//! Scrape Sandbox - Docker-backed sandbox for running Playwright scraping scripts
//!
//! This library manages the host directory layout, the sandbox image and the
//! long-lived interactive instance, and provides script templates, a
//! code-generation assistant and result exporters for the CLI.

pub mod assistant;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod layout;
pub mod process;
pub mod sandbox;
pub mod secrets;
pub mod templates;

pub use assistant::{CodeGenerator, OpenAiAssistant};
pub use config::{AssistantConfig, SandboxConfig, Validate, ValidationResult};
pub use error::{Error, Result};
pub use export::{CsvExporter, ExportFormat, Exporter, JsonExporter, Record};
pub use layout::{LayoutPaths, SandboxLayout, ScriptReference};
pub use process::{CommandOutput, ProcessRunner, RunOutcome, SystemRunner};
pub use sandbox::{
    ImageManager, ImageState, InstanceController, InstanceState, SandboxIdentity, SandboxManager,
    SandboxStatus, StopOutcome, StopReport, VolumeMount,
};
pub use secrets::{Secret, SecretError, SecretSource};
