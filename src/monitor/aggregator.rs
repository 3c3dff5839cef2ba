//! Authoritative table of currently known repositories.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::repository::RepositorySnapshot;

/// In-memory path → snapshot table.
///
/// Invariant: the key set equals the set of paths whose most recent resolution
/// was found. Callers mutate it from detector/observer callback threads while
/// the flush callback and external consumers read concurrently, so all access
/// goes through an internal lock.
#[derive(Debug, Default)]
pub struct RepositoryAggregator {
    repositories: RwLock<BTreeMap<PathBuf, RepositorySnapshot>>,
}

impl RepositoryAggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a repository is currently known under this path.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.repositories
            .read()
            .expect("aggregator lock poisoned")
            .contains_key(path)
    }

    /// Insert or replace the snapshot for its path.
    pub fn upsert(&self, snapshot: RepositorySnapshot) {
        self.repositories
            .write()
            .expect("aggregator lock poisoned")
            .insert(snapshot.path.clone(), snapshot);
    }

    /// Remove the entry for a path, returning the snapshot that was stored.
    pub fn remove(&self, path: &Path) -> Option<RepositorySnapshot> {
        self.repositories
            .write()
            .expect("aggregator lock poisoned")
            .remove(path)
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.repositories
            .write()
            .expect("aggregator lock poisoned")
            .clear();
    }

    /// Number of known repositories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.repositories
            .read()
            .expect("aggregator lock poisoned")
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all current entries, ordered by path.
    #[must_use]
    pub fn repositories(&self) -> Vec<RepositorySnapshot> {
        self.repositories
            .read()
            .expect("aggregator lock poisoned")
            .values()
            .cloned()
            .collect()
    }

    /// The current key set, ordered. This is what gets persisted.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.repositories
            .read()
            .expect("aggregator lock poisoned")
            .keys()
            .cloned()
            .collect()
    }
}
