//! Repository snapshot model.
//!
//! A snapshot is an immutable point-in-time description of one repository,
//! produced wholesale by a reader. A changed repository is represented by a
//! brand-new snapshot replacing the old one, never by partial mutation.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Per-category working tree file counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LocalCounts {
    pub untracked: usize,
    pub modified: usize,
    pub missing: usize,
    pub added: usize,
    pub staged: usize,
    pub removed: usize,
    pub ignored: usize,
}

/// Immutable description of one repository, keyed by its normalized path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepositorySnapshot {
    /// Absolute, normalized repository path. Aggregator key.
    pub path: PathBuf,
    /// Whether the path resolved to a repository at read time.
    pub was_found: bool,
    /// Display name, typically the directory name.
    pub name: String,
    /// Currently checked out branch, or a detached-head description.
    pub current_branch: String,
    /// Commits ahead of the tracked upstream, when known.
    pub ahead_by: Option<usize>,
    /// Commits behind the tracked upstream, when known.
    pub behind_by: Option<usize>,
    /// Working tree file counts.
    pub local_counts: LocalCounts,
    /// All local branch names.
    pub branches: Vec<String>,
    /// When this snapshot was produced.
    pub update_stamp: DateTime<Utc>,
}

impl RepositorySnapshot {
    /// Create a snapshot for a repository that was found.
    #[must_use]
    pub fn found(path: PathBuf, name: impl Into<String>, current_branch: impl Into<String>) -> Self {
        Self {
            path,
            was_found: true,
            name: name.into(),
            current_branch: current_branch.into(),
            ahead_by: None,
            behind_by: None,
            local_counts: LocalCounts::default(),
            branches: Vec::new(),
            update_stamp: Utc::now(),
        }
    }

    /// Create a snapshot for a path that did not resolve to a repository.
    #[must_use]
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            was_found: false,
            name: String::new(),
            current_branch: String::new(),
            ahead_by: None,
            behind_by: None,
            local_counts: LocalCounts::default(),
            branches: Vec::new(),
            update_stamp: Utc::now(),
        }
    }

    /// Attach the local branch list.
    #[must_use]
    pub fn with_branches(mut self, branches: Vec<String>) -> Self {
        self.branches = branches;
        self
    }

    /// The snapshot path as a borrowed `Path`.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the snapshot carries an empty path. Such snapshots are ignored
    /// by the monitor.
    #[must_use]
    pub fn has_empty_path(&self) -> bool {
        self.path.as_os_str().is_empty()
    }
}
