//! Application configuration
//!
//! Loaded from TOML, then overridden from the environment. Every section
//! falls back to its defaults when omitted.

use crate::error::{ConfigError, ConfigResult};
use hisab_query::RecordPath;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Overrides [`ApiConfig::base_url`]
pub const API_URL_ENV: &str = "HISAB_API_URL";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HisabConfig {
    /// Backend connection
    pub api: ApiConfig,
    /// Query cache tuning
    pub cache: CacheConfig,
    /// Persisted identity
    pub session: SessionConfig,
}

impl HisabConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With backend base URL
    #[inline]
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api.base_url = url.into();
        self
    }

    /// With freshness window in seconds
    #[inline]
    #[must_use]
    pub fn with_freshness_secs(mut self, secs: u64) -> Self {
        self.cache.freshness_secs = secs;
        self
    }

    /// With session file location
    #[inline]
    #[must_use]
    pub fn with_session_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.session.path = path.into();
        self
    }

    /// Parse TOML text
    ///
    /// # Errors
    /// - `ConfigError::Parse` on malformed TOML or unknown values
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML file
    ///
    /// # Errors
    /// - `ConfigError::Io` if the file cannot be read
    /// - `ConfigError::Parse` on malformed TOML
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        Self::from_toml_str(&text)
    }

    /// Load the effective configuration
    ///
    /// Reads `path` if given (defaults otherwise), applies environment
    /// overrides and validates the result.
    ///
    /// # Errors
    /// Any read, parse or validation error.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok());
        config.validate()?;
        tracing::debug!(base_url = %config.api.base_url, "configuration loaded");
        Ok(config)
    }

    /// Apply overrides from an environment lookup
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(API_URL_ENV).filter(|url| !url.trim().is_empty()) {
            self.api.base_url = url;
        }
    }

    /// API key from the variable named by [`ApiConfig::api_key_env`]
    #[must_use]
    pub fn api_key<F>(&self, lookup: F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        lookup(&self.api.api_key_env).filter(|key| !key.is_empty())
    }

    /// Check value ranges
    ///
    /// # Errors
    /// - `ConfigError::Invalid` naming the first bad field
    pub fn validate(&self) -> ConfigResult<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::invalid("api.base_url", "must not be empty"));
        }
        if self.api.timeout_secs == 0 {
            return Err(ConfigError::invalid("api.timeout_secs", "must be positive"));
        }
        if self.cache.freshness_secs == 0 {
            return Err(ConfigError::invalid("cache.freshness_secs", "must be positive"));
        }
        if self.cache.max_capacity == 0 {
            return Err(ConfigError::invalid("cache.max_capacity", "must be positive"));
        }
        Ok(())
    }

    /// Render as TOML
    ///
    /// # Errors
    /// - `ConfigError::Encode` if serialization fails
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Backend connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// REST endpoint root
    pub base_url: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Single-record addressing style
    pub record_path: RecordPath,
}

impl ApiConfig {
    /// Request timeout
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:54321/rest/v1".to_string(),
            api_key_env: "HISAB_API_KEY".to_string(),
            timeout_secs: 30,
            record_path: RecordPath::default(),
        }
    }
}

/// Query cache settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Seconds a fetched collection stays fresh
    pub freshness_secs: u64,
    /// Maximum cached collections
    pub max_capacity: u64,
}

impl CacheConfig {
    /// Freshness window
    #[inline]
    #[must_use]
    pub fn freshness(&self) -> Duration {
        Duration::from_secs(self.freshness_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            freshness_secs: hisab_query::cache::DEFAULT_FRESHNESS.as_secs(),
            max_capacity: hisab_query::cache::DEFAULT_MAX_CAPACITY,
        }
    }
}

/// Session persistence settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// File holding the signed-in identity
    pub path: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".hisab/session.json"),
        }
    }
}
