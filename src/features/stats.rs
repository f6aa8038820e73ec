use std::io::{self, Write};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::{Feature, FeatureError};
use crate::pr::{self, ChangeSource, FileChange};

/// Aggregate numbers about a PR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrStats {
    pub total_files: usize,
    /// (extension, file count), most frequent first; ties keep first-seen order
    pub extensions: Vec<(String, usize)>,
    pub total_reviews: usize,
}

impl PrStats {
    pub fn compute(files: &[FileChange], total_reviews: usize) -> Self {
        let mut extensions: Vec<(String, usize)> = Vec::new();
        for file in files {
            // files without a '.' have no extension and are left out
            let Some((_, ext)) = file.filename.rsplit_once('.') else {
                continue;
            };
            match extensions.iter_mut().find(|(seen, _)| seen.as_str() == ext) {
                Some((_, count)) => *count += 1,
                None => extensions.push((ext.to_string(), 1)),
            }
        }
        // stable sort keeps first-seen order among equal counts
        extensions.sort_by(|a, b| b.1.cmp(&a.1));

        Self {
            total_files: files.len(),
            extensions,
            total_reviews,
        }
    }

    pub fn render(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out)?;
        writeln!(out, "PR Statistics:")?;
        writeln!(out, "Total files changed: {}", self.total_files)?;
        writeln!(out)?;
        writeln!(out, "File types:")?;
        for (ext, count) in &self.extensions {
            writeln!(out, "- .{}: {} files", ext, count)?;
        }
        writeln!(out)?;
        writeln!(out, "Total reviews: {}", self.total_reviews)?;
        Ok(())
    }
}

/// Stats Aggregator
///
/// Counts changed files by extension and reports how many reviews the PR has.
pub struct StatsAggregator {
    source: Arc<dyn ChangeSource>,
}

impl StatsAggregator {
    pub fn new(source: Arc<dyn ChangeSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl Feature for StatsAggregator {
    fn name(&self) -> &str {
        "Generate PR Statistics"
    }

    async fn process(&self, reference: &str, out: &mut (dyn Write + Send)) -> Result<(), FeatureError> {
        let pr = pr::resolve(reference)?;
        let files = self.source.list_file_changes(&pr).await?;
        let reviews = self.source.list_reviews(&pr).await?;
        let stats = PrStats::compute(&files, reviews.len());
        info!(pr = %pr, files = stats.total_files, reviews = stats.total_reviews, "generated PR statistics");
        stats.render(out)?;
        Ok(())
    }
}
