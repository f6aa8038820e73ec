use std::io::{self, Write};
use std::sync::Arc;

use async_trait::async_trait;
use colored::Colorize;
use tracing::info;

use super::{Feature, FeatureError};
use crate::pr::diff::extract_changes;
use crate::pr::{self, ChangeSource, FileChange};

/// Code Change Extractor
///
/// Lists the deleted and then the added code lines of every file, with
/// diff metadata and context dropped.
pub struct CodeChangeExtractor {
    source: Arc<dyn ChangeSource>,
}

impl CodeChangeExtractor {
    pub fn new(source: Arc<dyn ChangeSource>) -> Self {
        Self { source }
    }
}

fn render_file(file: &FileChange, out: &mut dyn Write) -> io::Result<()> {
    let changes = extract_changes(file.patch.as_deref());

    writeln!(out)?;
    writeln!(out)?;
    writeln!(out, "{}", "-".repeat(80))?;
    writeln!(out, "File: {}", file.filename)?;
    writeln!(out, "Changes: +{} -{}", file.additions, file.deletions)?;
    writeln!(out, "{}", "-".repeat(80))?;

    if !changes.removed.is_empty() {
        writeln!(out)?;
        writeln!(out, "Deleted lines:")?;
        writeln!(out, "{}", "-".repeat(40))?;
        for line in &changes.removed {
            writeln!(out, "{}", format!("- {}", line).red())?;
        }
    }

    if !changes.added.is_empty() {
        writeln!(out)?;
        writeln!(out, "Added lines:")?;
        writeln!(out, "{}", "-".repeat(40))?;
        for line in &changes.added {
            writeln!(out, "{}", format!("+ {}", line).green())?;
        }
    }
    Ok(())
}

pub fn render(files: &[FileChange], out: &mut dyn Write) -> io::Result<()> {
    for file in files {
        render_file(file, out)?;
    }
    let additions: u64 = files.iter().map(|f| f.additions).sum();
    let deletions: u64 = files.iter().map(|f| f.deletions).sum();
    writeln!(out)?;
    writeln!(out, "{}", "-".repeat(80))?;
    writeln!(out, "Total changes: +{} -{}", additions, deletions)?;
    Ok(())
}

#[async_trait]
impl Feature for CodeChangeExtractor {
    fn name(&self) -> &str {
        "Extract Code Changes"
    }

    async fn process(&self, reference: &str, out: &mut (dyn Write + Send)) -> Result<(), FeatureError> {
        let pr = pr::resolve(reference)?;
        let files = self.source.list_file_changes(&pr).await?;
        info!(pr = %pr, files = files.len(), "extracting code changes");
        render(&files, out)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::tests::{file_change, run_feature, FakeSource, PR_URL};

    #[tokio::test]
    async fn test_lists_deleted_then_added_lines() {
        let patch = "--- a/app.py\n+++ b/app.py\n@@ -1,2 +1,2 @@\n keep()\n-old_call()\n+new_call()";
        let source = FakeSource::with_files(vec![file_change("app.py", 1, 1, Some(patch))]);
        let output = run_feature(&CodeChangeExtractor::new(source), PR_URL).await.unwrap();

        let deleted = output.find("Deleted lines:").unwrap();
        let added = output.find("Added lines:").unwrap();
        assert!(deleted < added);
        assert!(output.contains("- old_call()"));
        assert!(output.contains("+ new_call()"));
        assert!(!output.contains("keep()"));
        assert!(!output.contains("@@"));
        assert!(!output.contains("+++"));
        assert!(output.contains("Total changes: +1 -1"));
    }

    #[tokio::test]
    async fn test_file_without_patch_prints_header_only() {
        let source = FakeSource::with_files(vec![file_change("logo.png", 0, 0, None)]);
        let output = run_feature(&CodeChangeExtractor::new(source), PR_URL).await.unwrap();
        assert!(output.contains("File: logo.png"));
        assert!(!output.contains("Deleted lines:"));
        assert!(!output.contains("Added lines:"));
    }
}
