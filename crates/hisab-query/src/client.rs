//! Query client
//!
//! The explicitly constructed context object for data access. Build one per
//! application root and hand clones to whatever needs Get, Mutate or
//! Invalidate; clones share transport, catalog and cache.

use crate::cache::{CacheEntry, CacheStats, EntryState, QueryCache};
use crate::catalog::ResourceCatalog;
use crate::error::{QueryError, QueryResult};
use crate::key::ResourceKey;
use crate::mutation::{Mutation, MutationDispatcher};
use crate::transport::{Method, Transport};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// Shared handle to transport, catalog and cache
#[derive(Debug, Clone)]
pub struct QueryClient {
    transport: Arc<dyn Transport>,
    catalog: Arc<ResourceCatalog>,
    cache: QueryCache,
    mutations: MutationDispatcher,
}

impl QueryClient {
    /// Create client
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, catalog: ResourceCatalog, cache: QueryCache) -> Self {
        let catalog = Arc::new(catalog);
        let mutations =
            MutationDispatcher::new(Arc::clone(&transport), Arc::clone(&catalog), cache.clone());
        Self {
            transport,
            catalog,
            cache,
            mutations,
        }
    }

    /// Client with the default catalog and cache settings
    #[must_use]
    pub fn with_defaults(transport: Arc<dyn Transport>) -> Self {
        Self::new(transport, ResourceCatalog::with_defaults(), QueryCache::default())
    }

    /// Resource catalog
    #[inline]
    #[must_use]
    pub fn catalog(&self) -> &ResourceCatalog {
        &self.catalog
    }

    /// Underlying cache
    #[inline]
    #[must_use]
    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Cached collection for `key`, fetching it if absent or stale
    ///
    /// Concurrent calls for the same key share one request.
    ///
    /// # Errors
    /// - `QueryError::UnknownResource` if `key` is not in the catalog
    /// - `QueryError::Fetch` if the request fails
    pub async fn get(&self, key: &ResourceKey) -> QueryResult<Arc<CacheEntry>> {
        let path = self.catalog.path(key)?;
        let fetch = self.transport.request(Method::Get, path, None);
        self.cache
            .get_or_fetch(key, fetch)
            .await
            .map_err(|source| QueryError::Fetch {
                key: key.clone(),
                source,
            })
    }

    /// [`QueryClient::get`] decoded into typed records
    ///
    /// # Errors
    /// Same as [`QueryClient::get`], plus `QueryError::Decode` if a record
    /// does not match `T`.
    pub async fn get_as<T: DeserializeOwned>(&self, key: &ResourceKey) -> QueryResult<Vec<T>> {
        let entry = self.get(key).await?;
        entry
            .records()
            .iter()
            .map(|record| {
                T::deserialize(record).map_err(|e| QueryError::Decode {
                    key: key.clone(),
                    message: e.to_string(),
                })
            })
            .collect()
    }

    /// Mark `key` stale without fetching
    pub async fn invalidate(&self, key: &ResourceKey) {
        self.cache.invalidate(key).await;
    }

    /// Fetch `key` now and replace its entry
    ///
    /// # Errors
    /// - `QueryError::UnknownResource` if `key` is not in the catalog
    /// - `QueryError::Fetch` if the request fails; the entry is unchanged
    pub async fn refetch(&self, key: &ResourceKey) -> QueryResult<Arc<CacheEntry>> {
        let path = self.catalog.path(key)?;
        let fetch = self.transport.request(Method::Get, path, None);
        self.cache
            .refetch(key, fetch)
            .await
            .map_err(|source| QueryError::Fetch {
                key: key.clone(),
                source: Arc::new(source),
            })
    }

    /// Send a write and invalidate its dependents on success
    ///
    /// # Errors
    /// See [`MutationDispatcher::dispatch`].
    pub async fn mutate(&self, mutation: Mutation) -> QueryResult<Value> {
        self.mutations.dispatch(mutation).await
    }

    /// Optimistically append a record to a cached collection
    ///
    /// Not durable; a later refetch may disagree.
    pub async fn add_record(&self, key: &ResourceKey, record: Value) -> bool {
        self.cache.add_record(key, record).await
    }

    /// Optimistically remove a record from a cached collection
    pub async fn remove_record(&self, key: &ResourceKey, id: &Value) -> bool {
        self.cache.remove_record(key, id).await
    }

    /// Optimistically update a record in a cached collection
    pub async fn update_record(&self, key: &ResourceKey, id: &Value, changes: Value) -> bool {
        self.cache.update_record(key, id, changes).await
    }

    /// Lifecycle state of `key`
    #[inline]
    #[must_use]
    pub fn state(&self, key: &ResourceKey) -> EntryState {
        self.cache.state(key)
    }

    /// Get cache statistics
    #[inline]
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
