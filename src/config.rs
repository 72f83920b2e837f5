//! Sandbox configuration.
//!
//! Settings come from an optional TOML file and are then overridden by
//! environment variables:
//!
//! - `SANDBOX_RUNTIME` - container runtime binary (default `docker`)
//! - `SANDBOX_INSTANCE` - instance name
//! - `OPENAI_MODEL` / `OPENAI_BASE_URL` - code-generation service settings

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// File name looked up in the sandbox root when no config path is given.
pub const CONFIG_FILE_NAME: &str = "sandbox.toml";

/// Settings for the code-generation assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Chat model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// Base URL of the OpenAI-compatible API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Optional file holding the API key, used when `OPENAI_API_KEY` is unset.
    #[serde(default)]
    pub api_key_file: Option<PathBuf>,
}

fn default_model() -> String {
    "gpt-4".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com".to_string()
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
            api_key_file: None,
        }
    }
}

/// Configuration for the sandbox lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Container runtime binary.
    #[serde(default = "default_runtime")]
    pub runtime: String,
    /// Name of the managed instance.
    #[serde(default = "default_instance_name")]
    pub instance_name: String,
    /// Image repository name.
    #[serde(default = "default_image_base")]
    pub image_base: String,
    /// Image tag.
    #[serde(default = "default_image_tag")]
    pub image_tag: String,
    /// Build context directory. Relative paths resolve against the sandbox
    /// root; defaults to the root itself.
    #[serde(default)]
    pub build_context: Option<PathBuf>,
    /// Code-generation assistant settings.
    #[serde(default)]
    pub assistant: AssistantConfig,
}

fn default_runtime() -> String {
    "docker".to_string()
}

fn default_instance_name() -> String {
    "auto_scrape_sandbox".to_string()
}

fn default_image_base() -> String {
    "auto_scrape_sandbox".to_string()
}

fn default_image_tag() -> String {
    "latest".to_string()
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            runtime: default_runtime(),
            instance_name: default_instance_name(),
            image_base: default_image_base(),
            image_tag: default_image_tag(),
            build_context: None,
            assistant: AssistantConfig::default(),
        }
    }
}

impl SandboxConfig {
    /// Loads configuration for a sandbox rooted at `root`.
    ///
    /// An explicit `path` must exist. Without one, `<root>/sandbox.toml` is
    /// used if present and defaults otherwise. Environment overrides are
    /// applied last.
    pub fn load(root: &Path, path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = root.join(CONFIG_FILE_NAME);
                if default_path.is_file() {
                    Self::from_file(&default_path)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parses a TOML configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("invalid {}: {}", path.display(), e)))
    }

    /// Applies environment overrides using the given lookup.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(runtime) = lookup("SANDBOX_RUNTIME") {
            self.runtime = runtime;
        }
        if let Some(instance) = lookup("SANDBOX_INSTANCE") {
            self.instance_name = instance;
        }
        if let Some(model) = lookup("OPENAI_MODEL") {
            self.assistant.model = model;
        }
        if let Some(base_url) = lookup("OPENAI_BASE_URL") {
            self.assistant.base_url = base_url;
        }
    }

    /// Returns the full image reference (`base:tag`).
    pub fn image_name(&self) -> String {
        format!("{}:{}", self.image_base, self.image_tag)
    }

    /// Resolves the build context directory against the sandbox root.
    pub fn build_context_dir(&self, root: &Path) -> PathBuf {
        match &self.build_context {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => root.join(dir),
            None => root.to_path_buf(),
        }
    }
}

/// Validation result containing all found issues.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// List of validation errors (fatal).
    pub errors: Vec<String>,
    /// List of validation warnings (non-fatal).
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Adds an error to the result.
    pub fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    /// Adds a warning to the result.
    pub fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    /// Converts to a Result, failing if there are errors.
    pub fn into_result(self) -> Result<Vec<String>> {
        if self.is_valid() {
            Ok(self.warnings)
        } else {
            Err(Error::Config(self.errors.join("; ")))
        }
    }
}

/// Trait for validatable configuration types.
pub trait Validate {
    /// Validates the configuration and returns any issues found.
    fn validate(&self) -> ValidationResult;
}

impl Validate for SandboxConfig {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.runtime.trim().is_empty() {
            result.add_error("runtime cannot be empty");
        }

        if self.instance_name.trim().is_empty() {
            result.add_error("instance_name cannot be empty");
        } else if !is_valid_container_name(&self.instance_name) {
            result.add_error(format!(
                "instance_name '{}' may only contain [a-zA-Z0-9_.-] and must start with an alphanumeric character",
                self.instance_name
            ));
        }

        if self.image_base.trim().is_empty() {
            result.add_error("image_base cannot be empty");
        } else if self.image_base.chars().any(|c| c.is_ascii_uppercase()) {
            result.add_error(format!(
                "image_base '{}' must be lowercase",
                self.image_base
            ));
        }

        if self.image_tag.trim().is_empty() {
            result.add_error("image_tag cannot be empty");
        }

        if self.assistant.model.trim().is_empty() {
            result.add_warning("assistant model is empty, code generation will fail");
        }

        result
    }
}

fn is_valid_container_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphanumeric() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

/// Warns when the build context has no Dockerfile.
pub fn check_build_context(context: &Path) -> ValidationResult {
    let mut result = ValidationResult::default();
    if !context.join("Dockerfile").is_file() {
        result.add_warning(format!(
            "no Dockerfile found in build context {}",
            context.display()
        ));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_canonical_identity() {
        let config = SandboxConfig::default();
        assert_eq!(config.runtime, "docker");
        assert_eq!(config.instance_name, "auto_scrape_sandbox");
        assert_eq!(config.image_name(), "auto_scrape_sandbox:latest");
        assert_eq!(config.assistant.model, "gpt-4");
        assert!(config.validate().is_valid());
    }

    #[test]
    fn deserializes_partial_toml() {
        let toml = r#"
            instance_name = "scraper"
            image_tag = "v2"

            [assistant]
            model = "gpt-4o-mini"
        "#;

        let config: SandboxConfig = toml::from_str(toml).unwrap();

        assert_eq!(config.instance_name, "scraper");
        assert_eq!(config.image_name(), "auto_scrape_sandbox:v2");
        assert_eq!(config.runtime, "docker");
        assert_eq!(config.assistant.model, "gpt-4o-mini");
        assert_eq!(config.assistant.base_url, "https://api.openai.com");
    }

    #[test]
    fn env_overrides_file_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("SANDBOX_RUNTIME", "podman"),
            ("OPENAI_BASE_URL", "http://localhost:8080"),
        ]);
        let mut config = SandboxConfig::default();

        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.runtime, "podman");
        assert_eq!(config.assistant.base_url, "http://localhost:8080");
        assert_eq!(config.instance_name, "auto_scrape_sandbox");
    }

    #[test]
    fn load_reads_default_file_in_root() {
        let root = TempDir::new().unwrap();
        std::fs::write(root.path().join(CONFIG_FILE_NAME), "image_base = \"mysandbox\"\n").unwrap();

        let config = SandboxConfig::load(root.path(), None).unwrap();

        assert_eq!(config.image_base, "mysandbox");
    }

    #[test]
    fn load_rejects_missing_explicit_file() {
        let root = TempDir::new().unwrap();
        let missing = root.path().join("nope.toml");

        let result = SandboxConfig::load(root.path(), Some(&missing));

        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn invalid_toml_is_config_error() {
        let root = TempDir::new().unwrap();
        let path = root.path().join("bad.toml");
        std::fs::write(&path, "instance_name = [").unwrap();

        assert!(matches!(SandboxConfig::from_file(&path), Err(Error::Config(_))));
    }

    #[test]
    fn validation_rejects_bad_names() {
        let config = SandboxConfig {
            instance_name: "-bad name".to_string(),
            image_base: "Upper".to_string(),
            ..Default::default()
        };

        let result = config.validate();

        assert_eq!(result.errors.len(), 2);
        assert!(result.into_result().is_err());
    }

    #[test]
    fn build_context_resolves_relative_to_root() {
        let root = Path::new("/srv/sandbox");
        let mut config = SandboxConfig::default();
        assert_eq!(config.build_context_dir(root), PathBuf::from("/srv/sandbox"));

        config.build_context = Some(PathBuf::from("docker"));
        assert_eq!(config.build_context_dir(root), PathBuf::from("/srv/sandbox/docker"));

        config.build_context = Some(PathBuf::from("/opt/ctx"));
        assert_eq!(config.build_context_dir(root), PathBuf::from("/opt/ctx"));
    }

    #[test]
    fn missing_dockerfile_is_a_warning() {
        let dir = TempDir::new().unwrap();
        let result = check_build_context(dir.path());
        assert!(result.is_valid());
        assert_eq!(result.warnings.len(), 1);

        std::fs::write(dir.path().join("Dockerfile"), "FROM python:3.11\n").unwrap();
        assert!(check_build_context(dir.path()).warnings.is_empty());
    }
}
