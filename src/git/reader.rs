//! Marker-level repository reader.
//!
//! Resolves a path to a snapshot from the repository's own metadata files,
//! without shelling out or linking a git library. Counts that need a full
//! status computation stay at their defaults; a richer reader can be swapped
//! in behind the same trait.

use std::path::{Path, PathBuf};

use crate::fs::crawler::GIT_MARKER;
use crate::ports::RepositoryReader;
use crate::repository::RepositorySnapshot;

use super::head;

const WORKTREE_GITDIR_PREFIX: &str = "gitdir:";

/// Reader backed by `.git` metadata files.
#[derive(Debug, Default, Clone, Copy)]
pub struct GitDirReader;

impl GitDirReader {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn try_read(path: &Path) -> Option<RepositorySnapshot> {
        // Canonicalize so aggregator keys are absolute and normalized.
        let path = std::fs::canonicalize(path).ok()?;
        let git_dir = resolve_git_dir(&path)?;

        let head_contents = std::fs::read_to_string(git_dir.join("HEAD")).ok()?;
        let branch = head::branch_from_head(&head_contents)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Some(
            RepositorySnapshot::found(path, name, branch)
                .with_branches(local_branches(&git_dir)),
        )
    }
}

impl RepositoryReader for GitDirReader {
    fn read(&self, path: &Path) -> RepositorySnapshot {
        // Any failure along the way means "not a repository right now".
        Self::try_read(path).unwrap_or_else(|| RepositorySnapshot::not_found(path))
    }
}

/// The `.git` directory for a repository: the marker directory itself, or
/// the target named by a linked-worktree `gitdir:` file.
fn resolve_git_dir(repository: &Path) -> Option<PathBuf> {
    let marker = repository.join(GIT_MARKER);
    let metadata = std::fs::metadata(&marker).ok()?;
    if metadata.is_dir() {
        return Some(marker);
    }

    let contents = std::fs::read_to_string(&marker).ok()?;
    let target = contents.strip_prefix(WORKTREE_GITDIR_PREFIX)?.trim();
    let target = PathBuf::from(target);
    let resolved = if target.is_absolute() {
        target
    } else {
        repository.join(target)
    };
    resolved.is_dir().then_some(resolved)
}

/// Local branch names from `refs/heads`, slash-qualified for nested refs.
fn local_branches(git_dir: &Path) -> Vec<String> {
    let mut branches = Vec::new();
    collect_refs(&git_dir.join("refs").join("heads"), "", &mut branches);
    branches.sort();
    branches
}

fn collect_refs(dir: &Path, prefix: &str, out: &mut Vec<String>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        let qualified = if prefix.is_empty() {
            name
        } else {
            format!("{prefix}/{name}")
        };
        match entry.file_type() {
            Ok(kind) if kind.is_dir() => collect_refs(&entry.path(), &qualified, out),
            Ok(kind) if kind.is_file() => out.push(qualified),
            _ => {}
        }
    }
}
