//! Error types for the scrape sandbox.

use std::path::PathBuf;
use thiserror::Error;

/// Exit code reported when a run is interrupted with Ctrl+C.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Top-level error type for sandbox operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A host directory or file could not be created or read.
    #[error("filesystem error at {path}: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The image build exited with a non-zero status.
    #[error("image build failed with {}", describe_exit(.exit_code))]
    Build {
        stdout: String,
        stderr: String,
        exit_code: Option<i32>,
    },

    /// Stopping the instance failed. Never fatal to the process.
    #[error("failed to stop instance {instance}: {reason}")]
    Stop { instance: String, reason: String },

    /// The named script does not exist under the scripts directory.
    #[error("script not found: {}", .0.display())]
    ScriptNotFound(PathBuf),

    /// The script ran but exited with a non-zero status.
    #[error("script {script} failed with {}", describe_exit(.exit_code))]
    ScriptExecution {
        script: String,
        exit_code: Option<i32>,
    },

    /// An attached container session exited with a non-zero status.
    #[error("container exited with {}", describe_exit(.exit_code))]
    ContainerExit { exit_code: Option<i32> },

    /// The external program could not be started at all.
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The code-generation service call failed.
    #[error("code generation failed: {0}")]
    CodeGeneration(String),

    /// Exporting records failed.
    #[error("export failed: {0}")]
    Export(String),

    /// IO error outside of layout management.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the process exit code this error should produce.
    ///
    /// Only script failures propagate the container's own exit code.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::ScriptExecution {
                exit_code: Some(code),
                ..
            } if *code != 0 => *code,
            _ => 1,
        }
    }

    /// Wraps an IO error with the path it occurred on.
    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Filesystem {
            path: path.into(),
            source,
        }
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "termination by signal".to_string(),
    }
}

/// Result type alias for sandbox operations.
pub type Result<T> = std::result::Result<T, Error>;
