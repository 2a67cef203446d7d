//! Application context
//!
//! Owns the one [`SessionStore`] and the one [`QueryClient`] of a running
//! application. Everything that needs identity or data receives a reference
//! to the context instead of reaching for globals.

use crate::config::HisabConfig;
use crate::error::AppResult;
use hisab_auth::{AccessDecision, AccessGuard, AccessRequirement, FileStorage, Rendered, SessionStore, User};
use hisab_query::{CacheEntry, HttpTransport, QueryCache, QueryClient, ResourceCatalog, ResourceKey};
use std::sync::Arc;

/// Session plus data access, built once per process
#[derive(Debug, Clone)]
pub struct AppContext {
    config: Arc<HisabConfig>,
    session: Arc<SessionStore>,
    queries: QueryClient,
}

impl AppContext {
    /// Build the context from configuration
    ///
    /// Restores the persisted session and connects the HTTP transport. The
    /// API key is read from the variable named in the config.
    ///
    /// # Errors
    /// - `AppError::Config` if the configuration is invalid
    /// - `AppError::Session` if the session file cannot be read
    /// - `AppError::Transport` if the HTTP client cannot be built
    pub fn from_config(config: HisabConfig) -> AppResult<Self> {
        config.validate()?;

        let storage = FileStorage::new(config.session.path.clone());
        let session = SessionStore::restore(Arc::new(storage))?;

        let api_key = config.api_key(|name| std::env::var(name).ok());
        let transport = HttpTransport::new(config.api.base_url.clone(), api_key, config.api.timeout())?;
        let catalog = ResourceCatalog::with_defaults().with_record_path(config.api.record_path);
        let cache = QueryCache::new(config.cache.max_capacity, config.cache.freshness());
        let queries = QueryClient::new(Arc::new(transport), catalog, cache);

        tracing::debug!(
            base_url = %config.api.base_url,
            authenticated = session.is_authenticated(),
            "application context ready"
        );
        Ok(Self::new(config, session, queries))
    }

    /// Assemble a context from pre-built parts
    #[must_use]
    pub fn new(config: HisabConfig, session: SessionStore, queries: QueryClient) -> Self {
        Self {
            config: Arc::new(config),
            session: Arc::new(session),
            queries,
        }
    }

    /// Effective configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &HisabConfig {
        &self.config
    }

    /// Identity session
    #[inline]
    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Data access client
    #[inline]
    #[must_use]
    pub fn queries(&self) -> &QueryClient {
        &self.queries
    }

    /// Signed-in user, if any
    #[inline]
    #[must_use]
    pub fn current_user(&self) -> Option<Arc<User>> {
        self.session.current()
    }

    /// Evaluate `requirement` against the signed-in user
    #[must_use]
    pub fn check(&self, requirement: &AccessRequirement) -> AccessDecision {
        let user = self.session.current();
        requirement.evaluate(user.as_deref())
    }

    /// Render through `guard` for the signed-in user
    pub fn render<T, C, F>(&self, guard: &AccessGuard, content: C, fallback: Option<F>) -> Rendered<T>
    where
        C: FnOnce() -> T,
        F: FnOnce() -> T,
    {
        let user = self.session.current();
        guard.render(user.as_deref(), content, fallback)
    }

    /// Sign in from a login response body
    ///
    /// # Errors
    /// - `AppError::Session` if the payload is invalid or cannot be persisted
    pub fn sign_in_json(&self, payload: &str) -> AppResult<Arc<User>> {
        Ok(self.session.sign_in_json(payload)?)
    }

    /// Sign out and drop every cached collection
    ///
    /// # Errors
    /// - `AppError::Session` if the persisted identity cannot be removed
    pub fn sign_out(&self) -> AppResult<()> {
        self.queries.cache().invalidate_all();
        Ok(self.session.sign_out()?)
    }

    /// Cached or freshly fetched collection
    ///
    /// # Errors
    /// - `AppError::Query` on unknown resources or failed fetches
    pub async fn fetch(&self, key: &ResourceKey) -> AppResult<Arc<CacheEntry>> {
        Ok(self.queries.get(key).await?)
    }
}
