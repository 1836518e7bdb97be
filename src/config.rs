//! Configuration file parser for sdprobe.toml.
//!
//! The config file is optional — a missing file yields `Config::default()`.
//! Every key can also be overridden on the command line, and the server URI
//! additionally by the `SDSHARE_SERVER` environment variable.
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::feed::AuthorRule;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level checker configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be
/// specified. Missing keys fall back to `Default::default()`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URI of the server under test. Lowest-precedence source; the
    /// CLI argument and `SDSHARE_SERVER` both override it.
    pub server: Option<String>,

    /// Reading of the author rule for feeds with no entries.
    pub author_rule: AuthorRule,

    /// Keep crawling past structural violations instead of pruning the
    /// offending branch.
    pub keep_going: bool,

    /// Upper bound on pages followed along one `next` chain.
    pub max_pages: usize,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: None,
            author_rule: AuthorRule::Relaxed,
            keep_going: false,
            max_pages: 100,
            timeout_secs: 30,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → silently accepted, logged as a warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        // Parse as a raw table first to flag probable typos
        if let Ok(raw) = content.parse::<toml::Table>() {
            let known_keys = [
                "server",
                "author_rule",
                "keep_going",
                "max_pages",
                "timeout_secs",
            ];
            for key in raw.keys() {
                if !known_keys.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.server.is_none());
        assert_eq!(config.author_rule, AuthorRule::Relaxed);
        assert!(!config.keep_going);
        assert_eq!(config.max_pages, 100);
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/sdprobe_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert!(config.server.is_none());
        assert_eq!(config.max_pages, 100);
    }

    #[test]
    fn test_empty_file_returns_default() {
        let dir = std::env::temp_dir().join("sdprobe_config_test_empty");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("sdprobe.toml");
        std::fs::write(&path, "").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.timeout_secs, 30);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_partial_config_uses_defaults_for_missing() {
        let dir = std::env::temp_dir().join("sdprobe_config_test_partial");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("sdprobe.toml");
        std::fs::write(&path, "max_pages = 5\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.max_pages, 5);
        assert_eq!(config.timeout_secs, 30); // default
        assert!(!config.keep_going); // default

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_full_config() {
        let dir = std::env::temp_dir().join("sdprobe_config_test_full");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("sdprobe.toml");

        let content = r#"
server = "http://example.org/sdshare"
author_rule = "strict"
keep_going = true
max_pages = 10
timeout_secs = 5
"#;
        std::fs::write(&path, content).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.server.as_deref(), Some("http://example.org/sdshare"));
        assert_eq!(config.author_rule, AuthorRule::Strict);
        assert!(config.keep_going);
        assert_eq!(config.max_pages, 10);
        assert_eq!(config.timeout_secs, 5);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let dir = std::env::temp_dir().join("sdprobe_config_test_invalid");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("sdprobe.toml");
        std::fs::write(&path, "this is not [valid toml").unwrap();

        let result = Config::load(&path);
        assert!(matches!(result, Err(ConfigError::Parse(_))));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let dir = std::env::temp_dir().join("sdprobe_config_test_unknown");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("sdprobe.toml");
        std::fs::write(&path, "totally_fake_key = \"should not fail\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert!(config.server.is_none());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unknown_author_rule_returns_error() {
        let dir = std::env::temp_dir().join("sdprobe_config_test_rule");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("sdprobe.toml");
        std::fs::write(&path, "author_rule = \"lenient\"\n").unwrap();

        let result = Config::load(&path);
        assert!(matches!(result, Err(ConfigError::Parse(_))));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_wrong_type_returns_error() {
        let dir = std::env::temp_dir().join("sdprobe_config_test_wrongtype");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("sdprobe.toml");
        // max_pages should be an integer, not a string
        std::fs::write(&path, "max_pages = \"lots\"\n").unwrap();

        let result = Config::load(&path);
        assert!(result.is_err());

        std::fs::remove_dir_all(&dir).ok();
    }
}
