use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::pr::client::DEFAULT_API_URL;

pub const DEFAULT_CONFIG_FILE: &str = ".pr-assistant.toml";
pub const TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";
const DEFAULT_MAX_LINES: usize = 300;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("GitHub token not found: set github_token in .pr-assistant.toml, export GITHUB_TOKEN, or pass --token")]
    MissingToken,
}

/// Top-level configuration loaded from .pr-assistant.toml.
/// All fields are optional; the tool works with zero config as long as a
/// token is available from the environment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// GitHub API token. If None, falls back to GITHUB_TOKEN env var.
    pub github_token: Option<String>,

    /// Base URL of the GitHub REST API
    pub api_url: Option<String>,

    /// Quality scanner settings
    #[serde(default)]
    pub quality: QualityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QualityConfig {
    /// Patches longer than this many lines are reported as too long
    #[serde(default = "default_max_lines")]
    pub max_lines: usize,
}

fn default_max_lines() -> usize {
    DEFAULT_MAX_LINES
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            max_lines: DEFAULT_MAX_LINES,
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from .pr-assistant.toml in the
    /// current directory when no path is given. A missing default file
    /// yields the default config; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::load_from(path)
                } else {
                    Ok(Config::default())
                }
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Resolve the GitHub token: an explicit override wins, then the config
    /// file value, then the GITHUB_TOKEN env var.
    pub fn github_token(&self, token_override: Option<&str>) -> Result<String, ConfigError> {
        self.resolve_token(token_override, std::env::var(TOKEN_ENV_VAR).ok())
    }

    fn resolve_token(
        &self,
        token_override: Option<&str>,
        env_token: Option<String>,
    ) -> Result<String, ConfigError> {
        token_override
            .map(str::to_string)
            .into_iter()
            .chain(self.github_token.clone())
            .chain(env_token)
            .map(|t| t.trim().to_string())
            .find(|t| !t.is_empty())
            .ok_or(ConfigError::MissingToken)
    }

    pub fn api_url(&self) -> &str {
        self.api_url.as_deref().unwrap_or(DEFAULT_API_URL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.github_token.is_none());
        assert_eq!(config.api_url(), "https://api.github.com");
        assert_eq!(config.quality.max_lines, 300);
    }

    #[test]
    fn test_parse_config_toml() {
        let toml_str = r#"
github_token = "ghp_example"
api_url = "https://github.example.com/api/v3"

[quality]
max_lines = 120
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.github_token.as_deref(), Some("ghp_example"));
        assert_eq!(config.api_url(), "https://github.example.com/api/v3");
        assert_eq!(config.quality.max_lines, 120);
    }

    #[test]
    fn test_quality_section_defaults() {
        let config: Config = toml::from_str("[quality]\n").unwrap();
        assert_eq!(config.quality.max_lines, 300);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "github_token = \"from-file\"").unwrap();
        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.github_token.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(Config::load(Some(&missing)), Err(ConfigError::FileRead(_))));
    }

    #[test]
    fn test_load_invalid_toml_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "github_token = [unterminated").unwrap();
        assert!(matches!(Config::load(Some(file.path())), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_token_precedence() {
        let config = Config {
            github_token: Some("file".to_string()),
            ..Config::default()
        };
        assert_eq!(config.resolve_token(Some("cli"), Some("env".into())).unwrap(), "cli");
        assert_eq!(config.resolve_token(None, Some("env".into())).unwrap(), "file");
        assert_eq!(Config::default().resolve_token(None, Some("env".into())).unwrap(), "env");
    }

    #[test]
    fn test_empty_tokens_count_as_missing() {
        let config = Config {
            github_token: Some(String::new()),
            ..Config::default()
        };
        assert_eq!(config.resolve_token(None, Some("env".into())).unwrap(), "env");
        assert!(matches!(
            config.resolve_token(Some(" "), Some(String::new())),
            Err(ConfigError::MissingToken)
        ));
    }
}
