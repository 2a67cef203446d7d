//! Error types for the query layer
//!
//! Provides error handling for:
//! - Network requests (transport failures, non-success statuses)
//! - Cache reads that had to fetch
//! - Mutations
//!
//! Nothing here is retried; errors go to the immediate caller.

use crate::key::ResourceKey;
use std::sync::Arc;

/// Errors from the network layer
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Connection or protocol failure
    #[error("network error: {0}")]
    Network(String),

    /// Request exceeded the configured timeout
    #[error("request timed out")]
    Timeout,

    /// Server answered with a non-success status
    #[error("server returned {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body or reason phrase
        message: String,
    },

    /// Response body was not valid JSON
    #[error("invalid response body: {0}")]
    Decode(String),

    /// Transport could not be constructed
    #[error("transport configuration error: {0}")]
    Configuration(String),
}

impl TransportError {
    /// Create status error
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    /// Check if error is retryable
    ///
    /// Retrying is the caller's decision; the query layer never does it.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout => true,
            Self::Status { status, .. } => *status >= 500,
            Self::Decode(_) | Self::Configuration(_) => false,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else if err.is_builder() {
            Self::Configuration(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Main query layer error type
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// Key is not registered in the resource catalog
    #[error("unknown resource: {0}")]
    UnknownResource(ResourceKey),

    /// Invalid resource key syntax
    #[error("invalid resource key '{key}': {reason}")]
    InvalidKey {
        /// Rejected key
        key: String,
        /// Syntax rule it broke
        reason: &'static str,
    },

    /// Record id cannot be placed in a request path
    #[error("invalid record id '{id}': {reason}")]
    InvalidRecordId {
        /// Rejected id
        id: String,
        /// Syntax rule it broke
        reason: &'static str,
    },

    /// Get or Refetch failed; the cache entry is unchanged
    #[error("fetching '{key}' failed: {source}")]
    Fetch {
        /// Requested resource
        key: ResourceKey,
        /// Transport failure, shared by coalesced callers
        #[source]
        source: Arc<TransportError>,
    },

    /// Write failed; nothing was invalidated
    #[error("mutation on '{resource}' failed: {source}")]
    Mutation {
        /// Written resource
        resource: ResourceKey,
        /// Transport failure
        #[source]
        source: TransportError,
    },

    /// Cached payload does not match the requested type
    #[error("cannot decode '{key}': {message}")]
    Decode {
        /// Requested resource
        key: ResourceKey,
        /// Deserializer message
        message: String,
    },
}

impl QueryError {
    /// Create invalid key error
    pub fn invalid_key(key: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidKey {
            key: key.into(),
            reason,
        }
    }

    /// Create invalid record id error
    pub fn invalid_record_id(id: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidRecordId {
            id: id.into(),
            reason,
        }
    }

    /// Underlying transport error, if any
    #[must_use]
    pub fn transport(&self) -> Option<&TransportError> {
        match self {
            Self::Fetch { source, .. } => Some(source.as_ref()),
            Self::Mutation { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Check if error is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.transport().is_some_and(TransportError::is_retryable)
    }
}

/// Result type alias for query operations
pub type QueryResult<T> = Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_display() {
        let err = TransportError::status(404, "not found");
        assert_eq!(err.to_string(), "server returned 404: not found");
    }

    #[test]
    fn transport_error_is_retryable() {
        assert!(TransportError::Timeout.is_retryable());
        assert!(TransportError::Network("reset".to_string()).is_retryable());
        assert!(TransportError::status(503, "").is_retryable());
        assert!(!TransportError::status(422, "bad").is_retryable());
        assert!(!TransportError::Decode("x".to_string()).is_retryable());
    }

    #[test]
    fn query_error_exposes_transport() {
        let err = QueryError::Fetch {
            key: ResourceKey::TRANSACTIONS,
            source: Arc::new(TransportError::Timeout),
        };
        assert_eq!(err.transport(), Some(&TransportError::Timeout));
        assert!(err.is_retryable());
        assert!(err.to_string().contains("transactions"));

        assert!(QueryError::UnknownResource(ResourceKey::DASHBOARD).transport().is_none());
    }
}
