//! Token cache configuration.
//!
//! Holds the cache directory, the store-level TTL for cached entries, and the
//! safety margin subtracted from the broker's declared token lifetime.
//!
//! Configuration is stored at `~/.config/kis-token/config.json`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "kis-token";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Store-level lifetime of a cached entry (24 hours)
pub const DEFAULT_CACHE_EXPIRE_SECS: u64 = 86_400;

/// Seconds cut from the declared token lifetime to absorb clock skew and latency
pub const DEFAULT_SAFETY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenCacheConfig {
    pub cache_dir: Option<PathBuf>,
    /// Zero disables store-level expiry
    pub cache_expire_secs: u64,
    pub safety_margin_secs: i64,
}

impl Default for TokenCacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            cache_expire_secs: DEFAULT_CACHE_EXPIRE_SECS,
            safety_margin_secs: DEFAULT_SAFETY_MARGIN_SECS,
        }
    }
}

impl TokenCacheConfig {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load from an explicit path; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.cache_dir {
            return Ok(dir.clone());
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn cache_ttl(&self) -> Option<Duration> {
        (self.cache_expire_secs > 0).then(|| Duration::from_secs(self.cache_expire_secs))
    }

    /// Negative values are clamped to zero; a margin may only shorten a token's life
    pub fn safety_margin(&self) -> chrono::Duration {
        chrono::Duration::try_seconds(self.safety_margin_secs.max(0))
            .unwrap_or_else(|| chrono::Duration::seconds(DEFAULT_SAFETY_MARGIN_SECS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TokenCacheConfig::default();
        assert_eq!(config.cache_ttl(), Some(Duration::from_secs(86_400)));
        assert_eq!(config.safety_margin(), chrono::Duration::seconds(60));
        assert!(config.cache_dir.is_none());
    }

    #[test]
    fn test_zero_expire_disables_ttl() {
        let config = TokenCacheConfig {
            cache_expire_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.cache_ttl(), None);
    }

    #[test]
    fn test_negative_safety_margin_clamped_to_zero() {
        let config = TokenCacheConfig {
            safety_margin_secs: -3600,
            ..Default::default()
        };
        assert_eq!(config.safety_margin(), chrono::Duration::zero());
    }

    #[test]
    fn test_explicit_cache_dir_wins() {
        let config = TokenCacheConfig {
            cache_dir: Some(PathBuf::from("/tmp/kis")),
            ..Default::default()
        };
        assert_eq!(config.cache_dir().unwrap(), PathBuf::from("/tmp/kis"));
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = TokenCacheConfig::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, TokenCacheConfig::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"safety_margin_secs": 120}"#).unwrap();
        let config = TokenCacheConfig::load_from(&path).unwrap();
        assert_eq!(config.safety_margin_secs, 120);
        assert_eq!(config.cache_expire_secs, DEFAULT_CACHE_EXPIRE_SECS);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = TokenCacheConfig {
            cache_dir: Some(dir.path().join("cache")),
            cache_expire_secs: 3600,
            safety_margin_secs: 30,
        };
        config.save_to(&path).unwrap();
        assert_eq!(TokenCacheConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ nope").unwrap();
        let err = TokenCacheConfig::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
