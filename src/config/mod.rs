//! Configuration management for truthfeed.
//!
//! Configuration is read from `~/.config/truthfeed/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.
//! The library itself never reads the environment; the base URL reaches the
//! stream and snapshot clients only through [`Config`].

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use url::Url;

use crate::fetcher::SnapshotConfig;
use crate::stream::StreamConfig;

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub stream: StreamConfig,
    pub snapshot: SnapshotConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the feed API, e.g. `https://api.example.com`
    pub base_url: Option<String>,
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path, which must exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the default config file path: `~/.config/truthfeed/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("truthfeed").join("config.toml"))
    }

    /// The configured API base URL.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let raw = self
            .api
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingBaseUrl)?;

        Url::parse(raw).map_err(|source| ConfigError::InvalidBaseUrl {
            url: raw.to_string(),
            source,
        })
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    fn default_config_content() -> &'static str {
        r##"# truthfeed configuration

[api]
# Base URL of the feed API. Snapshots are fetched from {base_url}/truths/latest
# and live updates stream from {base_url}/truths-sse/stream.
# base_url = "https://api.example.com"

[stream]
# Reconnect automatically after the stream drops
auto_reconnect = true

# Consecutive failed attempts before giving up (use `reconnect` to retry)
max_reconnect_attempts = 5

# Fixed delay between attempts in milliseconds
reconnect_delay_ms = 3000

[snapshot]
# Timeout for the initial snapshot request in seconds
timeout_secs = 15
"##
    }
}

/// Append `path` to `base`, keeping any path prefix the base already has.
pub fn endpoint(base: &Url, path: &str) -> Result<Url, url::ParseError> {
    let joined = format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Url::parse(&joined)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("API base URL is not configured (set [api] base_url or pass --api-url)")]
    MissingBaseUrl,

    #[error("Invalid API base URL {url}: {source}")]
    InvalidBaseUrl {
        url: String,
        source: url::ParseError,
    },

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_default_config_deserializes() {
        let config: Config = toml::from_str(Config::default_config_content())
            .expect("Default config should be valid TOML");

        assert!(config.api.base_url.is_none());
        assert!(config.stream.auto_reconnect);
        assert_eq!(config.stream.max_reconnect_attempts, 5);
        assert_eq!(config.stream.reconnect_delay(), Duration::from_millis(3000));
        assert_eq!(config.snapshot.timeout(), Duration::from_secs(15));
    }

    #[test]
    fn test_partial_config() {
        let content = r##"
[api]
base_url = "https://api.example.com"

[stream]
max_reconnect_attempts = 2
"##;
        let config: Config = toml::from_str(content).expect("Partial config should work");

        assert_eq!(config.stream.max_reconnect_attempts, 2);
        assert_eq!(config.stream.reconnect_delay_ms, 3000);
        assert_eq!(
            config.base_url().unwrap().as_str(),
            "https://api.example.com/"
        );
    }

    #[test]
    fn test_empty_config() {
        let config: Config = toml::from_str("").expect("Empty config should work");
        assert!(matches!(config.base_url(), Err(ConfigError::MissingBaseUrl)));
    }

    #[test]
    fn test_invalid_base_url() {
        let mut config = Config::default();
        config.api.base_url = Some("not a url".into());
        assert!(matches!(
            config.base_url(),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[snapshot]\ntimeout_secs = 3\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.snapshot.timeout_secs, 3);
    }

    #[test]
    fn test_load_from_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[stream\n").unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let base = Url::parse("https://api.example.com/v1/").unwrap();
        assert_eq!(
            endpoint(&base, "truths/latest").unwrap().as_str(),
            "https://api.example.com/v1/truths/latest"
        );

        let base = Url::parse("http://localhost:8000").unwrap();
        assert_eq!(
            endpoint(&base, "/truths-sse/stream").unwrap().as_str(),
            "http://localhost:8000/truths-sse/stream"
        );
    }
}
