//! Error types for the authorization layer
//!
//! Covers failures at the identity boundary:
//! - Parsing roles and permission tokens
//! - Validating a deserialized user payload
//! - Reading and writing the persisted session
//!
//! An authorization denial is never an error; see [`crate::AccessDecision`].

use std::path::PathBuf;

/// Errors raised while validating an identity payload
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    /// Role string is not one of the known roles
    #[error("unknown role: '{0}'")]
    UnknownRole(String),

    /// Permission token has invalid syntax
    #[error("invalid permission token '{token}': {reason}")]
    InvalidPermission {
        /// Rejected token
        token: String,
        /// Syntax rule it broke
        reason: &'static str,
    },

    /// Required field missing or empty
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// Payload is not valid JSON or has the wrong shape
    #[error("malformed identity payload: {0}")]
    Malformed(String),
}

impl IdentityError {
    /// Create invalid permission error
    pub fn invalid_permission(token: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidPermission {
            token: token.into(),
            reason,
        }
    }
}

impl From<serde_json::Error> for IdentityError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}

/// Errors raised by the session store and its storage backends
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Persisted or supplied identity failed validation
    #[error("invalid identity: {0}")]
    Identity(#[from] IdentityError),

    /// IO error on the storage backend
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not encode the identity for storage
    #[error("failed to encode identity: {0}")]
    Encode(#[from] serde_json::Error),
}

impl SessionError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for session operations
pub type SessionResult<T> = Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_role_display() {
        let err = IdentityError::UnknownRole("owner".to_string());
        assert_eq!(err.to_string(), "unknown role: 'owner'");
    }

    #[test]
    fn invalid_permission_display() {
        let err = IdentityError::invalid_permission("Manage Users", "must be lowercase");
        assert!(err.to_string().contains("Manage Users"));
        assert!(err.to_string().contains("must be lowercase"));
    }

    #[test]
    fn identity_error_converts_into_session_error() {
        let err: SessionError = IdentityError::MissingField("username").into();
        assert!(matches!(err, SessionError::Identity(IdentityError::MissingField("username"))));
    }
}
