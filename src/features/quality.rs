use std::io::{self, Write};
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, info};

use super::{Feature, FeatureError};
use crate::pr::{self, ChangeSource, FileChange};

/// Extensions of files the scanner looks at.
const SOURCE_EXTENSIONS: [&str; 3] = [".py", ".js", ".java"];

/// Quality Scanner
///
/// Runs a fixed battery of heuristics over the patch of every changed
/// Python, JavaScript and Java file:
/// - Patch longer than the configured line limit
/// - Debug print calls
/// - TODO/FIXME markers
/// - Lines that only import a module
/// - One- or two-letter identifiers
/// - Bare numeric literals
///
/// These are text heuristics, not a static analyzer; false positives are expected.
pub struct QualityScanner {
    source: Arc<dyn ChangeSource>,
    max_lines: usize,
}

struct PatternCheck {
    pattern: &'static str,
    message: &'static str,
}

const PATTERN_CHECKS: [PatternCheck; 5] = [
    PatternCheck {
        pattern: r"print\(",
        message: "Contains print statements",
    },
    PatternCheck {
        pattern: r"TODO|FIXME",
        message: "Contains TODO/FIXME comments",
    },
    PatternCheck {
        pattern: r"(?m)import[ \t]+\w+[ \t]*$",
        message: "Contains unused import statements",
    },
    PatternCheck {
        pattern: r"\b[a-zA-Z]{1,2}\b",
        message: "Contains poorly named variables (too short)",
    },
    PatternCheck {
        pattern: r"\b\d+\b",
        message: "Contains magic numbers",
    },
];

fn compiled_checks() -> &'static [(Regex, &'static str)] {
    static CHECKS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    CHECKS.get_or_init(|| {
        PATTERN_CHECKS
            .iter()
            .map(|check| {
                let re = Regex::new(check.pattern).expect("Invalid quality check regex");
                (re, check.message)
            })
            .collect()
    })
}

impl QualityScanner {
    pub fn new(source: Arc<dyn ChangeSource>, max_lines: usize) -> Self {
        Self { source, max_lines }
    }

    pub fn is_source_file(filename: &str) -> bool {
        SOURCE_EXTENSIONS.iter().any(|ext| filename.ends_with(ext))
    }

    /// Apply every check to a patch body; each contributes at most one issue.
    pub fn check_code_quality(&self, patch: &str) -> Vec<String> {
        if patch.is_empty() {
            return Vec::new();
        }

        let mut issues = Vec::new();
        if patch.split('\n').count() > self.max_lines {
            issues.push(format!("File too long (>{} lines)", self.max_lines));
        }
        for (re, message) in compiled_checks() {
            if re.is_match(patch) {
                issues.push(message.to_string());
            }
        }
        issues
    }

    fn render(&self, files: &[FileChange], out: &mut dyn Write) -> io::Result<()> {
        for file in files.iter().filter(|f| Self::is_source_file(&f.filename)) {
            writeln!(out)?;
            writeln!(out, "Analyzing {}:", file.filename)?;
            let issues = self.check_code_quality(file.patch_text());
            debug!(file = %file.filename, issues = issues.len(), "quality checks done");
            for issue in issues {
                writeln!(out, "- {}", issue)?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Feature for QualityScanner {
    fn name(&self) -> &str {
        "Review Code Quality"
    }

    async fn process(&self, reference: &str, out: &mut (dyn Write + Send)) -> Result<(), FeatureError> {
        let pr = pr::resolve(reference)?;
        let files = self.source.list_file_changes(&pr).await?;
        info!(pr = %pr, files = files.len(), "reviewing code quality");
        self.render(&files, out)?;
        Ok(())
    }
}
