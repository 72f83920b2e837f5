//! Host directory layout shared with the container.

use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use crate::error::{Error, Result};

/// Directory under the sandbox root holding persisted script output.
pub const DATA_DIR_NAME: &str = "persistent_data";

/// Directory under the sandbox root holding user scripts.
pub const SCRIPTS_DIR_NAME: &str = "user_scripts";

/// Extension that marks a file in the scripts directory as runnable.
pub const SCRIPT_EXTENSION: &str = "py";

/// Paths guaranteed to exist after [`SandboxLayout::ensure`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayoutPaths {
    pub data_dir: PathBuf,
    pub scripts_dir: PathBuf,
}

/// A script resolved to its host path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptReference {
    /// File name as passed to the container.
    pub name: String,
    /// Absolute path on the host.
    pub host_path: PathBuf,
}

/// Manages the persistent-data and scripts directories of a sandbox root.
#[derive(Debug, Clone)]
pub struct SandboxLayout {
    root: PathBuf,
}

impl SandboxLayout {
    /// Creates a layout rooted at `root`.
    ///
    /// Relative roots are made absolute against the current directory since
    /// the runtime requires absolute bind-mount sources.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let root = if root.is_absolute() {
            root
        } else {
            let cwd = std::env::current_dir().map_err(|e| Error::filesystem(&root, e))?;
            cwd.join(root)
        };
        Ok(Self { root })
    }

    /// Returns the sandbox root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the persistent-data directory path.
    pub fn data_dir(&self) -> PathBuf {
        self.root.join(DATA_DIR_NAME)
    }

    /// Returns the scripts directory path.
    pub fn scripts_dir(&self) -> PathBuf {
        self.root.join(SCRIPTS_DIR_NAME)
    }

    /// Creates both directories if they are missing.
    pub fn ensure(&self) -> Result<LayoutPaths> {
        let data_dir = self.data_dir();
        let scripts_dir = self.scripts_dir();

        for dir in [&data_dir, &scripts_dir] {
            std::fs::create_dir_all(dir).map_err(|e| Error::filesystem(dir, e))?;
        }

        tracing::debug!(data_dir = ?data_dir, scripts_dir = ?scripts_dir, "sandbox layout ready");
        Ok(LayoutPaths {
            data_dir,
            scripts_dir,
        })
    }

    /// Resolves a script name to an existing file in the scripts directory.
    ///
    /// Only plain file names are accepted; anything with path components is
    /// treated as not found.
    pub fn resolve_script(&self, name: &str) -> Result<ScriptReference> {
        let host_path = self.scripts_dir().join(name);

        if !is_plain_file_name(name) || !host_path.is_file() {
            return Err(Error::ScriptNotFound(host_path));
        }

        Ok(ScriptReference {
            name: name.to_string(),
            host_path,
        })
    }

    /// Lists runnable scripts, sorted by name.
    pub fn list_scripts(&self) -> Result<Vec<String>> {
        let dir = self.scripts_dir();
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::filesystem(&dir, e)),
        };

        let mut scripts = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::filesystem(&dir, e))?;
            let path = entry.path();
            if path.is_file() && path.extension() == Some(OsStr::new(SCRIPT_EXTENSION)) {
                if let Some(name) = path.file_name() {
                    scripts.push(name.to_string_lossy().into_owned());
                }
            }
        }

        scripts.sort();
        Ok(scripts)
    }

    /// Writes a file into the scripts directory, creating the layout first.
    pub fn write_script(&self, name: &str, content: &str) -> Result<PathBuf> {
        if !is_plain_file_name(name) {
            return Err(Error::Config(format!(
                "script name must be a plain file name: {}",
                name
            )));
        }

        let paths = self.ensure()?;
        let path = paths.scripts_dir.join(name);
        std::fs::write(&path, content).map_err(|e| Error::filesystem(&path, e))?;
        Ok(path)
    }
}

/// Returns true if `name` is a single normal path component.
pub fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}
