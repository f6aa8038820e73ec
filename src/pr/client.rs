use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};

use super::types::{FileChange, PullRequestRef, Review};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("GitHub API returned 401 Unauthorized for {url}")]
    Unauthorized { url: String },

    #[error("GitHub API returned 404 Not Found for {url}")]
    NotFound { url: String },

    #[error("GitHub API request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("GitHub API request failed: {0}")]
    Network(#[source] reqwest::Error),

    #[error("Unexpected GitHub API response: {0}")]
    Decode(#[source] reqwest::Error),
}

impl RetrievalError {
    /// Map a non-success HTTP status onto the matching error kind.
    pub fn from_status(status: StatusCode, url: &str, body: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => RetrievalError::Unauthorized { url: url.to_string() },
            StatusCode::NOT_FOUND => RetrievalError::NotFound { url: url.to_string() },
            other => RetrievalError::Status {
                status: other.as_u16(),
                body,
            },
        }
    }

    /// HTTP status of the failed call, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            RetrievalError::Unauthorized { .. } => Some(401),
            RetrievalError::NotFound { .. } => Some(404),
            RetrievalError::Status { status, .. } => Some(*status),
            RetrievalError::Network(e) | RetrievalError::Decode(e) => e.status().map(|s| s.as_u16()),
        }
    }
}

/// Read access to a pull request's changed files and reviews.
/// Feature processors depend on this trait so tests can substitute a fake.
#[async_trait]
pub trait ChangeSource: Send + Sync {
    /// Changed files in the order the server returned them. Only the first
    /// page is fetched.
    async fn list_file_changes(&self, pr: &PullRequestRef) -> Result<Vec<FileChange>, RetrievalError>;

    async fn list_reviews(&self, pr: &PullRequestRef) -> Result<Vec<Review>, RetrievalError>;
}

/// GitHub REST client. One GET per call: no retries, caching or pagination.
pub struct GitHubClient {
    http: reqwest::Client,
    token: String,
    api_url: String,
}

impl GitHubClient {
    pub fn new(token: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            token: token.into(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn pull_url(&self, pr: &PullRequestRef, resource: &str) -> String {
        format!(
            "{}/repos/{}/{}/pulls/{}/{}",
            self.api_url, pr.owner, pr.repository, pr.number, resource
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, RetrievalError> {
        let response = self
            .http
            .get(url)
            .header("User-Agent", "pr-assistant")
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", "application/vnd.github.v3+json")
            .send()
            .await
            .map_err(RetrievalError::Network)?;

        let status = response.status();
        debug!(status = status.as_u16(), "received GitHub API response");
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RetrievalError::from_status(status, url, body));
        }

        response.json::<T>().await.map_err(RetrievalError::Decode)
    }
}

#[async_trait]
impl ChangeSource for GitHubClient {
    #[instrument(skip(self), fields(pr = %pr))]
    async fn list_file_changes(&self, pr: &PullRequestRef) -> Result<Vec<FileChange>, RetrievalError> {
        let url = self.pull_url(pr, "files");
        debug!(%url, "fetching PR files");
        let files: Vec<FileChange> = self.get_json(&url).await?;
        debug!(files = files.len(), "received PR files");
        Ok(files)
    }

    #[instrument(skip(self), fields(pr = %pr))]
    async fn list_reviews(&self, pr: &PullRequestRef) -> Result<Vec<Review>, RetrievalError> {
        let url = self.pull_url(pr, "reviews");
        debug!(%url, "fetching PR reviews");
        let reviews: Vec<Review> = self.get_json(&url).await?;
        debug!(reviews = reviews.len(), "received PR reviews");
        Ok(reviews)
    }
}
