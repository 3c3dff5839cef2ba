//! `.git/HEAD` parsing helpers.

const SYMBOLIC_REF_PREFIX: &str = "ref: ";
const BRANCH_REF_PREFIX: &str = "refs/heads/";
const SHORT_HASH_LEN: usize = 7;

/// Extract the branch description from `HEAD` file contents.
///
/// A symbolic ref yields the branch name; a detached head yields the
/// abbreviated commit hash in parentheses.
///
/// # Examples
///
/// ```
/// use repolens::git::head::branch_from_head;
///
/// assert_eq!(branch_from_head("ref: refs/heads/main\n"), Some("main".to_string()));
/// assert_eq!(
///     branch_from_head("8d3f2b1a9c0e4f5d6a7b8c9d0e1f2a3b4c5d6e7f\n"),
///     Some("(8d3f2b1)".to_string())
/// );
/// ```
#[must_use]
pub fn branch_from_head(contents: &str) -> Option<String> {
    let line = contents.lines().next()?.trim();
    if line.is_empty() {
        return None;
    }

    if let Some(target) = line.strip_prefix(SYMBOLIC_REF_PREFIX) {
        let target = target.trim();
        if target.is_empty() {
            return None;
        }
        let name = target.strip_prefix(BRANCH_REF_PREFIX).unwrap_or(target);
        return Some(name.to_string());
    }

    // Detached head: the file holds a raw commit hash.
    let short: String = line.chars().take(SHORT_HASH_LEN).collect();
    Some(format!("({short})"))
}
