//! API key handling for the code-generation service.
//!
//! Keys are resolved from a list of sources in order, never logged, and
//! scrubbed from any error text that might echo them back.

use std::env;
use std::fmt;
use std::path::PathBuf;

/// Environment variable consulted first for the API key.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Source from which to retrieve a secret value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretSource {
    /// Read from an environment variable.
    EnvVar(String),
    /// Read from a file; surrounding whitespace is trimmed.
    File(PathBuf),
    /// Provided directly (for testing only).
    Direct(String),
}

impl SecretSource {
    fn load(&self) -> Result<String, SecretError> {
        let value = match self {
            SecretSource::EnvVar(name) => env::var(name).map_err(|_| {
                SecretError::NotFound(format!("environment variable '{}' not set", name))
            })?,
            SecretSource::File(path) => std::fs::read_to_string(path)
                .map_err(|e| {
                    SecretError::NotFound(format!("cannot read file '{}': {}", path.display(), e))
                })?
                .trim()
                .to_string(),
            SecretSource::Direct(value) => value.clone(),
        };

        if value.is_empty() {
            return Err(SecretError::NotFound(format!("{} is empty", self.describe())));
        }
        Ok(value)
    }

    fn describe(&self) -> String {
        match self {
            SecretSource::EnvVar(name) => format!("environment variable '{}'", name),
            SecretSource::File(path) => format!("file '{}'", path.display()),
            SecretSource::Direct(_) => "direct value".to_string(),
        }
    }
}

/// A resolved secret. Its `Debug` output never shows the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret {
    name: String,
    value: String,
}

impl Secret {
    /// Creates a named secret.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Resolves the first source that yields a non-empty value.
    pub fn resolve(name: &str, sources: &[SecretSource]) -> Result<Self, SecretError> {
        let mut misses = Vec::new();
        for source in sources {
            match source.load() {
                Ok(value) => return Ok(Self::new(name, value)),
                Err(SecretError::NotFound(msg)) => misses.push(msg),
            }
        }
        Err(SecretError::NotFound(format!("{}: {}", name, misses.join("; "))))
    }

    /// Returns the secret value for use in a request header.
    pub fn expose(&self) -> &str {
        &self.value
    }

    /// Replaces every occurrence of the value with `[REDACTED:<name>]`.
    pub fn redact(&self, text: &str) -> String {
        if self.value.is_empty() {
            return text.to_string();
        }
        text.replace(&self.value, &format!("[REDACTED:{}]", self.name))
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secret")
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// Sources for the code-generation API key: the environment, then an
/// optional key file.
pub fn api_key_sources(key_file: Option<PathBuf>) -> Vec<SecretSource> {
    let mut sources = vec![SecretSource::EnvVar(API_KEY_ENV.to_string())];
    if let Some(path) = key_file {
        sources.push(SecretSource::File(path));
    }
    sources
}

/// Error type for secret operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretError {
    /// Secret source could not be found or read.
    NotFound(String),
}

impl fmt::Display for SecretError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretError::NotFound(msg) => write!(f, "secret not found: {}", msg),
        }
    }
}

impl std::error::Error for SecretError {}
