use serde::Deserialize;

/// Represents the parsed components of a GitHub PR reference.
/// Extracted by `resolve()` in pr/mod.rs; all three fields are non-empty
/// and `number` is all digits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestRef {
    pub owner: String,
    pub repository: String,
    pub number: String,
}

impl std::fmt::Display for PullRequestRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repository, self.number)
    }
}

/// A single file touched by the PR, as returned by the GitHub "files" resource.
/// Counts are taken from the API as-is, never recomputed from the patch.
#[derive(Debug, Clone, Deserialize)]
pub struct FileChange {
    /// File path (e.g., "src/auth/config.py")
    pub filename: String,
    /// Lines added in this file
    pub additions: u64,
    /// Lines deleted in this file
    pub deletions: u64,
    /// Unified diff body. GitHub omits it for binary files and very large diffs.
    #[serde(default)]
    pub patch: Option<String>,
}

impl FileChange {
    /// Patch text, with an omitted patch read as empty.
    pub fn patch_text(&self) -> &str {
        self.patch.as_deref().unwrap_or_default()
    }
}

/// A PR review. Only ever counted, so the payload is kept opaque.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
#[allow(dead_code)] // payload is carried but never inspected
pub struct Review(serde_json::Value);
