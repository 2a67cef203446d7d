//! Network transport
//!
//! The query layer consumes a single request function; [`Transport`] is
//! that seam. [`HttpTransport`] talks to a PostgREST-style backend
//! (Supabase or Neon), tests supply their own implementation.

use crate::error::TransportError;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt::{self, Debug};
use std::time::Duration;

/// HTTP method of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Read a collection
    Get,
    /// Create a record
    Post,
    /// Update a record
    Patch,
    /// Delete a record
    Delete,
}

impl Method {
    /// Check if the method writes
    #[inline]
    #[must_use]
    pub fn is_write(self) -> bool {
        !matches!(self, Self::Get)
    }

    /// Method name
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Request function used by Get, Refetch and Mutate
///
/// Timeouts and retries, if any, belong to the implementation.
#[async_trait]
pub trait Transport: Debug + Send + Sync {
    /// Issue a request and return the decoded JSON body
    ///
    /// An empty success body is returned as `Value::Null`.
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, TransportError>;
}

/// Transport over HTTP using reqwest
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    /// Create transport for `base_url`
    ///
    /// When `api_key` is set it is sent both as the `apikey` header and as a
    /// bearer token, as Supabase expects.
    ///
    /// # Errors
    /// - `TransportError::Configuration` if the URL is empty or the client
    ///   cannot be built
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(TransportError::Configuration("empty base url".to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Configuration(e.to_string()))?;
        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    /// Base URL without trailing slash
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, TransportError> {
        let url = self.url(path);
        tracing::debug!(%method, %url, "http request");

        let mut request = self.client.request(method.into(), &url);
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key).bearer_auth(key);
        }
        if method.is_write() {
            // PostgREST returns the written rows only when asked
            request = request.header("Prefer", "return=representation");
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            tracing::debug!(%method, %url, status = status.as_u16(), "request failed");
            return Err(TransportError::status(status.as_u16(), text));
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| TransportError::Decode(e.to_string()))
    }
}
