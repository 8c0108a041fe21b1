// Standard library imports
use std::fs;
use std::path::{Path, PathBuf};

// External crate imports
use tracing::debug;

// Internal imports
use crate::config::ConfigFile;
use dsnap_core::error::{Result, SnapError};

pub const DEFAULT_CONFIG_FILE: &str = "dsnap.yaml";

/// Finds and loads the optional `dsnap.yaml` configuration file.
///
/// Priority:
/// 1. **Explicit path:** `--config <path>`; a missing file is an error.
/// 2. **Current directory:** `dsnap.yaml` when present.
/// 3. **Nothing:** an empty [`ConfigFile`], leaving everything to CLI flags.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    search_dir: Option<PathBuf>,
}

impl ConfigLoader {
    /// Creates a loader that searches the current working directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a loader that searches `dir` instead of the working directory.
    pub fn with_search_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            search_dir: Some(dir.into()),
        }
    }

    pub fn load(&self, explicit: Option<&Path>) -> Result<ConfigFile> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(SnapError::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            debug!("Loading config from: {}", path.display());
            return Self::load_file(path);
        }

        let local = match &self.search_dir {
            Some(dir) => dir.join(DEFAULT_CONFIG_FILE),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };
        if local.exists() {
            debug!("Loading config from: {}", local.display());
            return Self::load_file(&local);
        }

        debug!("No config file found, using command-line settings only");
        Ok(ConfigFile::default())
    }

    /// Loads and deserializes a [`ConfigFile`] from `path`.
    pub fn load_file(path: &Path) -> Result<ConfigFile> {
        let contents = fs::read_to_string(path).map_err(|e| {
            SnapError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&contents, &path.display().to_string())
    }

    /// Parse YAML text; `source` names the origin in error messages.
    pub fn parse(contents: &str, source: &str) -> Result<ConfigFile> {
        if contents.trim().is_empty() {
            return Ok(ConfigFile::default());
        }
        serde_yaml_ng::from_str(contents)
            .map_err(|e| SnapError::Config(format!("Invalid config in {}: {}", source, e)))
    }
}
