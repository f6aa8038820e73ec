pub mod changes;
pub mod dependencies;
pub mod extract;
pub mod quality;
pub mod stats;

use std::io::Write;
use std::sync::Arc;

use async_trait::async_trait;
use clap::ValueEnum;
use thiserror::Error;

use crate::config::Config;
use crate::pr::{ChangeSource, ResolutionError, RetrievalError};

#[derive(Debug, Error)]
pub enum FeatureError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

impl FeatureError {
    /// HTTP status of a failed retrieval, if that is what went wrong.
    pub fn status(&self) -> Option<u16> {
        match self {
            FeatureError::Retrieval(e) => e.status(),
            _ => None,
        }
    }
}

/// A workflow the user can pick: resolve a PR reference, fetch what it
/// needs and write console text.
#[async_trait]
pub trait Feature: Send + Sync {
    /// Menu label (e.g., "Analyze PR Changes")
    fn name(&self) -> &str;

    async fn process(&self, reference: &str, out: &mut (dyn Write + Send)) -> Result<(), FeatureError>;
}

/// Selection table entry for every feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FeatureKind {
    /// Colored rendering of every patch
    Changes,
    /// Heuristic code-quality hints for source files
    Quality,
    /// Dependencies declared in manifest files
    Dependencies,
    /// File-type histogram and review count
    Stats,
    /// Added and deleted code lines per file
    Extract,
}

/// Feature-independent settings taken from the configuration.
#[derive(Debug, Clone)]
pub struct FeatureSettings {
    pub max_lines: usize,
}

impl From<&Config> for FeatureSettings {
    fn from(config: &Config) -> Self {
        Self {
            max_lines: config.quality.max_lines,
        }
    }
}

impl Default for FeatureSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl FeatureKind {
    pub fn build(self, source: Arc<dyn ChangeSource>, settings: &FeatureSettings) -> Box<dyn Feature> {
        match self {
            FeatureKind::Changes => Box::new(changes::DiffRenderer::new(source)),
            FeatureKind::Quality => Box::new(quality::QualityScanner::new(source, settings.max_lines)),
            FeatureKind::Dependencies => Box::new(dependencies::DependencyScanner::new(source)),
            FeatureKind::Stats => Box::new(stats::StatsAggregator::new(source)),
            FeatureKind::Extract => Box::new(extract::CodeChangeExtractor::new(source)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pr::{FileChange, PullRequestRef, Review};
    use reqwest::StatusCode;

    pub const PR_URL: &str = "https://github.com/acme/widgets/pull/42";

    /// In-memory ChangeSource returning canned files and reviews.
    pub struct FakeSource {
        pub files: Vec<FileChange>,
        pub reviews: usize,
        pub fail_with: Option<StatusCode>,
    }

    impl FakeSource {
        pub fn with_files(files: Vec<FileChange>) -> Arc<dyn ChangeSource> {
            Arc::new(FakeSource {
                files,
                reviews: 0,
                fail_with: None,
            })
        }

        pub fn failing(status: StatusCode) -> Arc<dyn ChangeSource> {
            Arc::new(FakeSource {
                files: vec![],
                reviews: 0,
                fail_with: Some(status),
            })
        }

        fn check(&self, pr: &PullRequestRef) -> Result<(), RetrievalError> {
            assert_eq!(pr.owner, "acme");
            match self.fail_with {
                Some(status) => Err(RetrievalError::from_status(status, "fake://files", "fake body".to_string())),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl ChangeSource for FakeSource {
        async fn list_file_changes(&self, pr: &PullRequestRef) -> Result<Vec<FileChange>, RetrievalError> {
            self.check(pr)?;
            Ok(self.files.clone())
        }

        async fn list_reviews(&self, pr: &PullRequestRef) -> Result<Vec<Review>, RetrievalError> {
            self.check(pr)?;
            let reviews = (0..self.reviews)
                .map(|id| serde_json::from_value(serde_json::json!({ "id": id })).unwrap())
                .collect();
            Ok(reviews)
        }
    }

    /// Helper to create a FileChange for testing.
    pub fn file_change(filename: &str, additions: u64, deletions: u64, patch: Option<&str>) -> FileChange {
        FileChange {
            filename: filename.to_string(),
            additions,
            deletions,
            patch: patch.map(str::to_string),
        }
    }

    /// Run a feature against a reference and capture what it printed.
    pub async fn run_feature(feature: &dyn Feature, reference: &str) -> Result<String, FeatureError> {
        let mut out = Vec::new();
        feature.process(reference, &mut out).await?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[tokio::test]
    async fn test_every_kind_builds_a_named_feature() {
        let source = FakeSource::with_files(vec![]);
        let settings = FeatureSettings::default();
        let names: Vec<String> = FeatureKind::value_variants()
            .iter()
            .map(|kind| kind.build(source.clone(), &settings).name().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "Analyze PR Changes",
                "Review Code Quality",
                "Check Dependencies",
                "Generate PR Statistics",
                "Extract Code Changes",
            ]
        );
    }

    #[tokio::test]
    async fn test_malformed_reference_fails_every_feature() {
        let source = FakeSource::with_files(vec![]);
        let settings = FeatureSettings::default();
        for kind in FeatureKind::value_variants() {
            let feature = kind.build(source.clone(), &settings);
            let err = run_feature(feature.as_ref(), "https://example.com/nothing").await.unwrap_err();
            assert!(matches!(err, FeatureError::Resolution(_)));
            assert_eq!(err.status(), None);
        }
    }

    #[tokio::test]
    async fn test_retrieval_failure_propagates_with_status() {
        let source = FakeSource::failing(StatusCode::NOT_FOUND);
        let feature = FeatureKind::Stats.build(source, &FeatureSettings::default());
        let err = run_feature(feature.as_ref(), PR_URL).await.unwrap_err();
        assert_eq!(err.status(), Some(404));
    }
}
