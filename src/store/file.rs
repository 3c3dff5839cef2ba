//! File-backed repository path store.

use std::fs;
use std::path::{Path, PathBuf};

use crate::ports::RepositoryStore;

/// Persists the known repository paths as a JSON array.
///
/// Writes go to a temporary file first, then rename into place, so a crash
/// mid-write never corrupts the stored list. Read and write faults are
/// logged and degraded (empty list, skipped write) — the monitor never sees
/// a store fault, per its contract.
#[derive(Debug, Clone)]
pub struct FileRepositoryStore {
    path: PathBuf,
}

impl FileRepositoryStore {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store location under the user data directory, when one exists.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        Some(dirs::data_dir()?.join("repolens").join("repositories.json"))
    }

    /// Where this store reads and writes.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RepositoryStore for FileRepositoryStore {
    fn get(&self) -> Vec<PathBuf> {
        if !self.path.exists() {
            return Vec::new();
        }

        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(error) => {
                tracing::warn!(%error, path = %self.path.display(), "Failed to read store");
                return Vec::new();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(paths) => paths,
            Err(error) => {
                tracing::warn!(%error, path = %self.path.display(), "Failed to parse store");
                Vec::new()
            }
        }
    }

    fn set(&self, paths: &[PathBuf]) {
        if let Err(error) = write_atomically(&self.path, paths) {
            tracing::warn!(%error, path = %self.path.display(), "Failed to write store");
        }
    }
}

fn write_atomically(path: &Path, paths: &[PathBuf]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let contents = serde_json::to_string_pretty(paths)?;
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, contents)?;
    fs::rename(&temp_path, path)?;

    Ok(())
}
