pub mod client;
pub mod diff;
pub mod types;

pub use client::{ChangeSource, GitHubClient, RetrievalError};
pub use types::{FileChange, PullRequestRef, Review};

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("Invalid GitHub PR URL: {0}")]
    Malformed(String),
}

fn reference_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"github\.com/([^/]+)/([^/]+)/pull/(\d+)").expect("valid PR reference regex")
    })
}

/// Resolve a PR reference string into owner, repository and number.
///
/// The `github.com/<owner>/<repo>/pull/<digits>` pattern is searched for
/// anywhere in the input, so surrounding text (scheme, query strings,
/// trailing `/files`) is ignored.
pub fn resolve(reference: &str) -> Result<PullRequestRef, ResolutionError> {
    let captures = reference_pattern()
        .captures(reference)
        .ok_or_else(|| ResolutionError::Malformed(reference.to_string()))?;

    Ok(PullRequestRef {
        owner: captures[1].to_string(),
        repository: captures[2].to_string(),
        number: captures[3].to_string(),
    })
}
