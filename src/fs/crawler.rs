//! Blocking crawl for repository markers beneath a root.

use std::path::{Path, PathBuf};

/// Marker entry identifying a repository root. A plain file also counts, so
/// linked worktrees are discovered too.
pub const GIT_MARKER: &str = ".git";

/// Walk the tree under `root` and collect every directory containing a
/// repository marker, the root itself included.
///
/// Never descends into a `.git` entry. Unreadable directories are skipped
/// rather than reported; a scan is best-effort by design.
#[must_use]
pub fn collect_repository_candidates(root: &Path) -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        if dir.join(GIT_MARKER).exists() {
            candidates.push(dir.clone());
        }

        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            if entry.file_name() == GIT_MARKER {
                continue;
            }
            // Symlinks are not followed; file_type() reports the link itself.
            let is_dir = entry.file_type().is_ok_and(|kind| kind.is_dir());
            if is_dir {
                pending.push(entry.path());
            }
        }
    }

    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn init_repo(path: &Path) {
        std::fs::create_dir_all(path.join(".git")).unwrap();
    }

    #[test]
    fn test_empty_root() {
        let dir = TempDir::new().unwrap();
        assert!(collect_repository_candidates(dir.path()).is_empty());
    }

    #[test]
    fn test_finds_repositories_at_depth() {
        let dir = TempDir::new().unwrap();
        init_repo(&dir.path().join("a"));
        init_repo(&dir.path().join("nested/deeply/b"));
        std::fs::create_dir_all(dir.path().join("plain/dir")).unwrap();

        let mut found = collect_repository_candidates(dir.path());
        found.sort();

        assert_eq!(
            found,
            vec![dir.path().join("a"), dir.path().join("nested/deeply/b")]
        );
    }

    #[test]
    fn test_root_itself_is_a_candidate() {
        let dir = TempDir::new().unwrap();
        init_repo(dir.path());

        let found = collect_repository_candidates(dir.path());
        assert_eq!(found, vec![dir.path().to_path_buf()]);
    }

    #[test]
    fn test_finds_nested_repositories() {
        let dir = TempDir::new().unwrap();
        init_repo(&dir.path().join("outer"));
        init_repo(&dir.path().join("outer/vendor/inner"));

        let mut found = collect_repository_candidates(dir.path());
        found.sort();

        assert_eq!(
            found,
            vec![
                dir.path().join("outer"),
                dir.path().join("outer/vendor/inner")
            ]
        );
    }

    #[test]
    fn test_never_descends_into_git_dir() {
        let dir = TempDir::new().unwrap();
        init_repo(&dir.path().join("repo"));
        // A marker inside .git must not surface as a repository.
        std::fs::create_dir_all(dir.path().join("repo/.git/modules/sub/.git")).unwrap();

        let found = collect_repository_candidates(dir.path());
        assert_eq!(found, vec![dir.path().join("repo")]);
    }

    #[test]
    fn test_worktree_marker_file_counts() {
        let dir = TempDir::new().unwrap();
        let worktree = dir.path().join("linked");
        std::fs::create_dir_all(&worktree).unwrap();
        std::fs::write(worktree.join(".git"), "gitdir: /elsewhere/.git/worktrees/linked").unwrap();

        let found = collect_repository_candidates(dir.path());
        assert_eq!(found, vec![worktree]);
    }

    #[test]
    fn test_missing_root_is_empty() {
        let found = collect_repository_candidates(Path::new("/nonexistent/root-xyz"));
        assert!(found.is_empty());
    }
}
