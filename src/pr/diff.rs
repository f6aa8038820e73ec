/// Prefixes of unified-diff lines that describe structure rather than content.
const METADATA_PREFIXES: [&str; 5] = ["@@", "diff", "index", "---", "+++"];

/// One line of a patch body, tagged by its diff marker.
///
/// `Added` and `Removed` carry the text with the leading marker stripped;
/// `Other` carries the raw line (context, hunk headers, file headers).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifiedLine<'a> {
    Added(&'a str),
    Removed(&'a str),
    Other(&'a str),
}

/// Whether a raw patch line is diff metadata (hunk or file header).
pub fn is_metadata(line: &str) -> bool {
    METADATA_PREFIXES.iter().any(|prefix| line.starts_with(prefix))
}

fn classify_line(line: &str) -> ClassifiedLine<'_> {
    if is_metadata(line) {
        return ClassifiedLine::Other(line);
    }
    if let Some(text) = line.strip_prefix('+') {
        ClassifiedLine::Added(text)
    } else if let Some(text) = line.strip_prefix('-') {
        ClassifiedLine::Removed(text)
    } else {
        ClassifiedLine::Other(line)
    }
}

/// Classify every line of a patch body. An absent or empty patch yields
/// no lines.
pub fn classify(patch: Option<&str>) -> Vec<ClassifiedLine<'_>> {
    match patch {
        Some(body) if !body.is_empty() => body.lines().map(classify_line).collect(),
        _ => Vec::new(),
    }
}

/// Added and removed code lines of a patch, with metadata and context dropped.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CodeChanges<'a> {
    pub added: Vec<&'a str>,
    pub removed: Vec<&'a str>,
}

pub fn extract_changes(patch: Option<&str>) -> CodeChanges<'_> {
    let mut changes = CodeChanges::default();
    for line in classify(patch) {
        match line {
            ClassifiedLine::Added(text) => changes.added.push(text),
            ClassifiedLine::Removed(text) => changes.removed.push(text),
            ClassifiedLine::Other(_) => {}
        }
    }
    changes
}

/// Reconstruct the new-side text covered by a patch: context and added
/// lines with their markers stripped, removed lines and metadata dropped.
pub fn post_image(patch: Option<&str>) -> String {
    let mut lines = Vec::new();
    for line in classify(patch) {
        match line {
            ClassifiedLine::Added(text) => lines.push(text),
            ClassifiedLine::Removed(_) => {}
            ClassifiedLine::Other(raw) => {
                // "\ No newline at end of file" is a marker, not content
                if is_metadata(raw) || raw.starts_with('\\') {
                    continue;
                }
                lines.push(raw.strip_prefix(' ').unwrap_or(raw));
            }
        }
    }
    lines.join("\n")
}
