use std::io::{self, Write};
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, info};

use super::{Feature, FeatureError};
use crate::pr::diff::post_image;
use crate::pr::{self, ChangeSource, FileChange};

const MANIFEST_FILES: [&str; 3] = ["requirements.txt", "package.json", "pom.xml"];

/// Version comparison operators accepted in requirements.txt, longest first.
const REQUIREMENT_OPERATORS: [&str; 7] = ["==", ">=", "<=", "~=", "!=", ">", "<"];

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("`dependencies` is not an object")]
    NotAMapping,

    #[error("invalid requirement line: {0}")]
    Requirement(String),

    #[error("dependency block without artifactId")]
    MissingArtifact,
}

/// A declared dependency and its version constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub name: String,
    pub version: String,
}

impl Dependency {
    fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// Dependency Scanner
///
/// Lists the dependencies declared in changed manifest files. The patch is
/// reduced to its new-side text and parsed according to the manifest type;
/// a manifest that does not parse contributes nothing.
pub struct DependencyScanner {
    source: Arc<dyn ChangeSource>,
}

impl DependencyScanner {
    pub fn new(source: Arc<dyn ChangeSource>) -> Self {
        Self { source }
    }

    pub fn is_manifest(filename: &str) -> bool {
        MANIFEST_FILES.contains(&filename)
    }

    fn render(&self, files: &[FileChange], out: &mut dyn Write) -> io::Result<()> {
        for file in files.iter().filter(|f| Self::is_manifest(&f.filename)) {
            writeln!(out)?;
            writeln!(out, "Checking dependencies in {}:", file.filename)?;
            for dep in dependencies_or_empty(file) {
                writeln!(out, "- {}: {}", dep.name, dep.version)?;
            }
        }
        Ok(())
    }
}

/// Parse a manifest's dependencies from the new side of its patch.
pub fn parse_dependencies(file: &FileChange) -> Result<Vec<Dependency>, ManifestError> {
    let document = post_image(file.patch.as_deref());
    match file.filename.as_str() {
        "package.json" => parse_package_json(&document),
        "requirements.txt" => parse_requirements(&document),
        "pom.xml" => parse_pom(&document),
        _ => Ok(Vec::new()),
    }
}

fn dependencies_or_empty(file: &FileChange) -> Vec<Dependency> {
    match parse_dependencies(file) {
        Ok(deps) => deps,
        Err(e) => {
            debug!(file = %file.filename, error = %e, "skipping unparsable manifest");
            Vec::new()
        }
    }
}

fn parse_package_json(document: &str) -> Result<Vec<Dependency>, ManifestError> {
    let value: serde_json::Value = serde_json::from_str(document)?;
    let Some(deps) = value.get("dependencies") else {
        return Ok(Vec::new());
    };
    let deps = deps.as_object().ok_or(ManifestError::NotAMapping)?;
    Ok(deps
        .iter()
        .map(|(name, version)| match version.as_str() {
            Some(v) => Dependency::new(name.as_str(), v),
            None => Dependency::new(name.as_str(), version.to_string()),
        })
        .collect())
}

fn parse_requirements(document: &str) -> Result<Vec<Dependency>, ManifestError> {
    let mut deps = Vec::new();
    for line in document.lines() {
        let line = line.split('#').next().unwrap_or_default().trim();
        // blank lines and pip options (-r, -e, --index-url)
        if line.is_empty() || line.starts_with('-') {
            continue;
        }
        let line = line.split(';').next().unwrap_or_default().trim();

        let split = REQUIREMENT_OPERATORS
            .iter()
            .filter_map(|op| line.find(op).map(|idx| (idx, *op)))
            .min_by_key(|(idx, _)| *idx);
        let (name, version) = match split {
            Some((idx, op)) => (line[..idx].trim(), line[idx + op.len()..].trim()),
            None => (line, "*"),
        };

        let valid_name = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || "-_.[],".contains(c));
        if !valid_name || version.is_empty() {
            return Err(ManifestError::Requirement(line.to_string()));
        }
        deps.push(Dependency::new(name, version));
    }
    Ok(deps)
}

fn dependency_block() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<dependency>(.*?)</dependency>").expect("Invalid dependency block regex"))
}

fn xml_field(block: &str, tag: &str) -> Option<String> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = block.find(&open)? + open.len();
    let len = block[start..].find(&close)?;
    Some(block[start..start + len].trim().to_string())
}

fn parse_pom(document: &str) -> Result<Vec<Dependency>, ManifestError> {
    dependency_block()
        .captures_iter(document)
        .map(|captures| -> Result<Dependency, ManifestError> {
            let block = &captures[1];
            let artifact = xml_field(block, "artifactId").ok_or(ManifestError::MissingArtifact)?;
            let name = match xml_field(block, "groupId") {
                Some(group) => format!("{}:{}", group, artifact),
                None => artifact,
            };
            let version = xml_field(block, "version").unwrap_or_else(|| "managed".to_string());
            Ok(Dependency::new(name, version))
        })
        .collect()
}

#[async_trait]
impl Feature for DependencyScanner {
    fn name(&self) -> &str {
        "Check Dependencies"
    }

    async fn process(&self, reference: &str, out: &mut (dyn Write + Send)) -> Result<(), FeatureError> {
        let pr = pr::resolve(reference)?;
        let files = self.source.list_file_changes(&pr).await?;
        info!(pr = %pr, files = files.len(), "checking dependencies");
        self.render(&files, out)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::tests::{file_change, run_feature, FakeSource, PR_URL};

    const PACKAGE_JSON_PATCH: &str = r#"@@ -1,6 +1,7 @@
 {
   "name": "widgets",
   "dependencies": {
-    "express": "^4.17.0"
+    "express": "^4.18.2",
+    "lodash": "4.17.21"
   }
 }"#;

    const POM_PATCH: &str = r#"@@ -10,6 +10,16 @@
   <dependencies>
+    <dependency>
+      <groupId>org.slf4j</groupId>
+      <artifactId>slf4j-api</artifactId>
+      <version>2.0.9</version>
+    </dependency>
+    <dependency>
+      <groupId>junit</groupId>
+      <artifactId>junit</artifactId>
+    </dependency>
   </dependencies>"#;

    #[test]
    fn test_manifest_allow_list_is_exact() {
        assert!(DependencyScanner::is_manifest("package.json"));
        assert!(DependencyScanner::is_manifest("requirements.txt"));
        assert!(DependencyScanner::is_manifest("pom.xml"));
        assert!(!DependencyScanner::is_manifest("web/package.json"));
        assert!(!DependencyScanner::is_manifest("Cargo.toml"));
    }

    #[test]
    fn test_parse_package_json_patch() {
        let file = file_change("package.json", 2, 1, Some(PACKAGE_JSON_PATCH));
        let deps = parse_dependencies(&file).unwrap();
        assert_eq!(
            deps,
            vec![
                Dependency::new("express", "^4.18.2"),
                Dependency::new("lodash", "4.17.21"),
            ]
        );
    }

    #[test]
    fn test_unparsable_package_json_fails_locally() {
        let file = file_change("package.json", 1, 0, Some("@@ -3,1 +3,1 @@\n+    \"left-pad\": \"1.3.0\","));
        assert!(matches!(parse_dependencies(&file), Err(ManifestError::Json(_))));
        assert!(dependencies_or_empty(&file).is_empty());
    }

    #[test]
    fn test_parse_requirements_patch() {
        let patch = "@@ -1,2 +1,5 @@\n requests==2.31.0\n-flask==2.0.0\n+flask>=3.0\n+# pinned for CI\n+-r dev.txt\n+numpy";
        let file = file_change("requirements.txt", 3, 1, Some(patch));
        let deps = parse_dependencies(&file).unwrap();
        assert_eq!(
            deps,
            vec![
                Dependency::new("requests", "2.31.0"),
                Dependency::new("flask", "3.0"),
                Dependency::new("numpy", "*"),
            ]
        );
    }

    #[test]
    fn test_invalid_requirement_line_fails() {
        let file = file_change("requirements.txt", 1, 0, Some("+this is not a requirement"));
        assert!(matches!(parse_dependencies(&file), Err(ManifestError::Requirement(_))));
    }

    #[test]
    fn test_parse_pom_patch() {
        let file = file_change("pom.xml", 9, 0, Some(POM_PATCH));
        let deps = parse_dependencies(&file).unwrap();
        assert_eq!(
            deps,
            vec![
                Dependency::new("org.slf4j:slf4j-api", "2.0.9"),
                Dependency::new("junit:junit", "managed"),
            ]
        );
    }

    #[tokio::test]
    async fn test_bad_manifest_does_not_abort_scan() {
        let source = FakeSource::with_files(vec![
            file_change("package.json", 1, 0, Some("+{ not json")),
            file_change("src/app.py", 1, 0, Some("+import os")),
            file_change("requirements.txt", 1, 0, Some("+django==5.0")),
        ]);
        let output = run_feature(&DependencyScanner::new(source), PR_URL).await.unwrap();

        assert!(output.contains("Checking dependencies in package.json:"));
        assert!(output.contains("Checking dependencies in requirements.txt:"));
        assert!(output.contains("- django: 5.0"));
        assert!(!output.contains("app.py"));
    }

    #[tokio::test]
    async fn test_manifest_without_patch_lists_nothing() {
        let source = FakeSource::with_files(vec![file_change("package.json", 0, 0, None)]);
        let output = run_feature(&DependencyScanner::new(source), PR_URL).await.unwrap();
        assert!(output.contains("Checking dependencies in package.json:"));
        assert!(!output.contains("- "));
    }
}
