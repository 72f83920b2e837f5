//! Image presence checks and builds.

use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::process::ProcessRunner;

use super::identity::ImageState;

/// Queries and builds the sandbox image through the container runtime.
#[derive(Clone)]
pub struct ImageManager {
    runner: Arc<dyn ProcessRunner>,
    runtime: String,
    image_name: String,
}

impl ImageManager {
    /// Creates an image manager for `image_name` using the `runtime` binary.
    pub fn new(
        runner: Arc<dyn ProcessRunner>,
        runtime: impl Into<String>,
        image_name: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            runtime: runtime.into(),
            image_name: image_name.into(),
        }
    }

    /// Returns the image reference this manager addresses.
    pub fn image_name(&self) -> &str {
        &self.image_name
    }

    /// Returns true if the image exists locally. Query failures count as absent.
    pub async fn exists(&self) -> bool {
        let args = vec!["images".to_string(), "-q".to_string(), self.image_name.clone()];

        match self.runner.output(&self.runtime, &args).await {
            Ok(output) if output.success() => !output.stdout.trim().is_empty(),
            Ok(output) => {
                tracing::warn!(
                    image = %self.image_name,
                    exit_code = ?output.exit_code,
                    stderr = %output.stderr.trim(),
                    "image query failed, treating image as absent"
                );
                false
            }
            Err(e) => {
                tracing::warn!(image = %self.image_name, error = %e, "image query failed, treating image as absent");
                false
            }
        }
    }

    /// Returns the current image state.
    pub async fn state(&self) -> ImageState {
        ImageState::from(self.exists().await)
    }

    /// Builds the image from `context_dir`, overwriting any existing tag.
    pub async fn build(&self, context_dir: &Path) -> Result<()> {
        let args = vec![
            "build".to_string(),
            "-t".to_string(),
            self.image_name.clone(),
            context_dir.display().to_string(),
        ];

        tracing::info!(image = %self.image_name, context = ?context_dir, "building image");
        let output = self.runner.output(&self.runtime, &args).await?;

        if !output.success() {
            tracing::error!(image = %self.image_name, exit_code = ?output.exit_code, "image build failed");
            return Err(Error::Build {
                stdout: output.stdout,
                stderr: output.stderr,
                exit_code: output.exit_code,
            });
        }

        tracing::info!(image = %self.image_name, "image built");
        Ok(())
    }
}
