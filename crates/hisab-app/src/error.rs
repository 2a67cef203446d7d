//! Error types for the application layer

use hisab_auth::SessionError;
use hisab_query::{QueryError, TransportError};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("cannot read config {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Malformed TOML
    #[error("invalid config syntax: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config cannot be rendered
    #[error("cannot encode config: {0}")]
    Encode(#[from] toml::ser::Error),

    /// Value out of range
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Dotted field name
        field: &'static str,
        /// Constraint that failed
        reason: &'static str,
    },
}

impl ConfigError {
    /// Create I/O error
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create range error
    pub fn invalid(field: &'static str, reason: &'static str) -> Self {
        Self::Invalid { field, reason }
    }
}

/// Result type alias for configuration
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors surfaced by the application context
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Identity persistence error
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Data access error
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Transport could not be built
    #[error("transport setup failed: {0}")]
    Transport(#[from] TransportError),
}

impl AppError {
    /// Check if retrying the operation may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Query(err) => err.is_retryable(),
            Self::Config(_) | Self::Session(_) | Self::Transport(_) => false,
        }
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ConfigError::invalid("cache.max_capacity", "must be positive");
        assert_eq!(err.to_string(), "invalid cache.max_capacity: must be positive");
    }

    #[test]
    fn transport_setup_is_not_retryable() {
        let err = AppError::from(TransportError::Configuration("empty base url".to_string()));
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("empty base url"));
    }
}
