//! Anonymous local persistence.
//!
//! Stores the comparison list as JSON under a single fixed key file in the
//! data directory. Writes are whole-file overwrites (last-writer-wins);
//! malformed data is treated as empty rather than surfaced.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::warn;

/// Fixed key for the anonymous comparison list.
const COMPARISON_FILE: &str = "comparison.json";

/// Local device storage rooted at an explicit data directory.
#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn comparison_path(&self) -> PathBuf {
        self.dir.join(COMPARISON_FILE)
    }

    /// Reads the stored comparison list.
    ///
    /// A missing or unparsable file yields an empty list; parse failures are
    /// logged, never surfaced.
    pub fn load_comparison(&self) -> Vec<String> {
        let path = self.comparison_path();
        if !path.exists() {
            return Vec::new();
        }

        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to read comparison list");
                return Vec::new();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(ids) => ids,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to parse comparison list");
                Vec::new()
            }
        }
    }

    /// Overwrites the stored comparison list.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created or the file
    /// cannot be written.
    pub fn save_comparison(&self, ids: &[String]) -> Result<()> {
        let path = self.comparison_path();

        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create directory {}", self.dir.display()))?;

        let contents =
            serde_json::to_string(ids).context("Failed to serialize comparison list")?;
        fs::write(&path, contents)
            .with_context(|| format!("Failed to write to {}", path.display()))?;

        Ok(())
    }
}
