//! Engine configuration, loadable from TOML.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

fn default_page_size() -> usize {
    1_000
}

fn default_max_workers() -> usize {
    0
}

fn default_response_cache_capacity() -> usize {
    100
}

fn default_response_cache_ttl_secs() -> u64 {
    3_600
}

fn default_stream_cache_dir() -> PathBuf {
    PathBuf::from("cache")
}

fn default_channel_capacity() -> usize {
    64
}

/// Engine tuning knobs.
///
/// Every field has a default matching the reference deployment, so a partial
/// (or absent) TOML file is fine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Bars per store page in streaming mode.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Worker threads for parallel modes; 0 means one per available core.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Response cache entry limit.
    #[serde(default = "default_response_cache_capacity")]
    pub response_cache_capacity: usize,

    /// Response cache entry lifetime in seconds.
    #[serde(default = "default_response_cache_ttl_secs")]
    pub response_cache_ttl_secs: u64,

    /// Directory holding fingerprint-keyed stream replay files.
    #[serde(default = "default_stream_cache_dir")]
    pub stream_cache_dir: PathBuf,

    /// Per-instrument chunk queue bound in parallel streaming.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_workers: default_max_workers(),
            response_cache_capacity: default_response_cache_capacity(),
            response_cache_ttl_secs: default_response_cache_ttl_secs(),
            stream_cache_dir: default_stream_cache_dir(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl EngineConfig {
    /// Load a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let config = EngineConfig::from_toml("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.page_size, 1_000);
        assert_eq!(config.response_cache_capacity, 100);
        assert_eq!(config.response_cache_ttl_secs, 3_600);
    }

    #[test]
    fn partial_toml_overrides_selected_fields() {
        let config = EngineConfig::from_toml(
            r#"
            page_size = 250
            max_workers = 4
            stream_cache_dir = "/tmp/barcast-cache"
            "#,
        )
        .unwrap();
        assert_eq!(config.page_size, 250);
        assert_eq!(config.max_workers, 4);
        assert_eq!(config.stream_cache_dir, PathBuf::from("/tmp/barcast-cache"));
        assert_eq!(config.channel_capacity, 64);
    }

    #[test]
    fn bad_toml_is_a_parse_error() {
        let err = EngineConfig::from_toml("page_size = \"lots\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
