//! Configuration for the nest client.
//!
//! Loads configuration from `${NEST_HOME}/config.toml` with sensible defaults.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the remote service.
    pub api_base_url: String,

    /// Directory for anonymous local persistence. Defaults to `NEST_HOME`.
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: Self::DEFAULT_API_BASE_URL.to_string(),
            data_dir: None,
        }
    }
}

impl Config {
    pub const DEFAULT_API_BASE_URL: &'static str = "http://localhost:8000";

    /// Loads the configuration from the default location.
    ///
    /// A missing file yields the defaults. `NEST_API_BASE_URL` overrides the
    /// configured base URL either way.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads the configuration from an explicit path (used by tests).
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))?
        } else {
            Self::default()
        };

        if let Ok(url) = std::env::var("NEST_API_BASE_URL") {
            let trimmed = url.trim();
            if !trimmed.is_empty() {
                config.api_base_url = trimmed.to_string();
            }
        }

        Ok(config)
    }

    /// Resolves the data directory for local persistence.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(paths::nest_home)
    }
}

pub mod paths {
    //! Path resolution for nest configuration and data directories.
    //!
    //! NEST_HOME resolution order:
    //! 1. NEST_HOME environment variable (if set)
    //! 2. ~/.config/nest (default)

    use std::path::PathBuf;

    /// Returns the nest home directory.
    pub fn nest_home() -> PathBuf {
        if let Ok(home) = std::env::var("NEST_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .map(|h| h.join(".config").join("nest"))
            .expect("Could not determine home directory")
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        nest_home().join("config.toml")
    }
}
