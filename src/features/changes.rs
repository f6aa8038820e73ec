use std::io::{self, Write};
use std::sync::Arc;

use async_trait::async_trait;
use colored::Colorize;
use tracing::info;

use super::{Feature, FeatureError};
use crate::pr::diff::{classify, ClassifiedLine};
use crate::pr::{self, ChangeSource, FileChange};

/// Diff Renderer
///
/// Prints every changed file with its counts and full patch, additions in
/// green and deletions in red, followed by the PR-wide totals.
pub struct DiffRenderer {
    source: Arc<dyn ChangeSource>,
}

impl DiffRenderer {
    pub fn new(source: Arc<dyn ChangeSource>) -> Self {
        Self { source }
    }
}

fn render_file(file: &FileChange, out: &mut dyn Write) -> io::Result<()> {
    let rule = "=".repeat(80);
    writeln!(out)?;
    writeln!(out, "{}", rule)?;
    writeln!(out, "File: {}", file.filename)?;
    writeln!(out, "Changes: +{} -{}", file.additions, file.deletions)?;
    writeln!(out, "{}", rule)?;

    for line in classify(file.patch.as_deref()) {
        match line {
            ClassifiedLine::Added(text) => writeln!(out, "{}", format!("+{}", text).green())?,
            ClassifiedLine::Removed(text) => writeln!(out, "{}", format!("-{}", text).red())?,
            ClassifiedLine::Other(raw) => writeln!(out, "{}", raw)?,
        }
    }
    Ok(())
}

/// Render all files and the closing totals.
pub fn render(files: &[FileChange], out: &mut dyn Write) -> io::Result<()> {
    for file in files {
        render_file(file, out)?;
    }
    let additions: u64 = files.iter().map(|f| f.additions).sum();
    let deletions: u64 = files.iter().map(|f| f.deletions).sum();
    writeln!(out)?;
    writeln!(out, "Total: +{} -{}", additions, deletions)?;
    Ok(())
}

#[async_trait]
impl Feature for DiffRenderer {
    fn name(&self) -> &str {
        "Analyze PR Changes"
    }

    async fn process(&self, reference: &str, out: &mut (dyn Write + Send)) -> Result<(), FeatureError> {
        let pr = pr::resolve(reference)?;
        let files = self.source.list_file_changes(&pr).await?;
        info!(pr = %pr, files = files.len(), "rendering PR changes");
        render(&files, out)?;
        Ok(())
    }
}
