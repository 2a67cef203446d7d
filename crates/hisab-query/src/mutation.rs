//! Mutations and their dispatch
//!
//! A [`Mutation`] is a write against one resource. The
//! [`MutationDispatcher`] sends it and, only after the server accepts it,
//! invalidates every key that depends on the written resource.

use crate::cache::QueryCache;
use crate::catalog::ResourceCatalog;
use crate::error::{QueryError, QueryResult};
use crate::key::ResourceKey;
use crate::transport::{Method, Transport};
use serde_json::Value;
use std::sync::Arc;

/// Kind of write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationKind {
    /// Create a record in the collection
    Create,
    /// Update the record with `id`
    Update {
        /// Record identifier
        id: String,
    },
    /// Delete the record with `id`
    Delete {
        /// Record identifier
        id: String,
    },
}

impl MutationKind {
    /// HTTP method used for this kind
    #[inline]
    #[must_use]
    pub fn method(&self) -> Method {
        match self {
            Self::Create => Method::Post,
            Self::Update { .. } => Method::Patch,
            Self::Delete { .. } => Method::Delete,
        }
    }
}

/// A write against one resource
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    /// Written resource
    pub resource: ResourceKey,
    /// Create, update or delete
    pub kind: MutationKind,
    /// Request body
    pub body: Option<Value>,
    /// Explicit invalidation list; `None` uses the catalog's dependents
    pub invalidates: Option<Vec<ResourceKey>>,
}

impl Mutation {
    /// Create a record
    #[must_use]
    pub fn create(resource: ResourceKey, body: Value) -> Self {
        Self {
            resource,
            kind: MutationKind::Create,
            body: Some(body),
            invalidates: None,
        }
    }

    /// Update record `id` with `changes`
    #[must_use]
    pub fn update(resource: ResourceKey, id: impl Into<String>, changes: Value) -> Self {
        Self {
            resource,
            kind: MutationKind::Update { id: id.into() },
            body: Some(changes),
            invalidates: None,
        }
    }

    /// Delete record `id`
    #[must_use]
    pub fn delete(resource: ResourceKey, id: impl Into<String>) -> Self {
        Self {
            resource,
            kind: MutationKind::Delete { id: id.into() },
            body: None,
            invalidates: None,
        }
    }

    /// Declare exactly which keys to invalidate on success
    #[must_use]
    pub fn invalidating(mut self, keys: impl IntoIterator<Item = ResourceKey>) -> Self {
        self.invalidates = Some(keys.into_iter().collect());
        self
    }

    /// Request path of this mutation
    ///
    /// # Errors
    /// - `QueryError::UnknownResource` if the resource is not registered
    /// - `QueryError::InvalidRecordId` if an update or delete id is malformed
    pub fn path(&self, catalog: &ResourceCatalog) -> QueryResult<String> {
        match &self.kind {
            MutationKind::Create => catalog.path(&self.resource).map(str::to_string),
            MutationKind::Update { id } | MutationKind::Delete { id } => {
                catalog.record_path(&self.resource, id)
            }
        }
    }

    /// Keys invalidated on success, deduplicated, in declaration order
    #[must_use]
    pub fn planned_invalidations(&self, catalog: &ResourceCatalog) -> Vec<ResourceKey> {
        match &self.invalidates {
            Some(declared) => {
                let mut keys: Vec<ResourceKey> = Vec::with_capacity(declared.len());
                for key in declared {
                    if !keys.contains(key) {
                        keys.push(key.clone());
                    }
                }
                keys
            }
            None => catalog.dependents(&self.resource),
        }
    }
}

/// Sends mutations and applies their invalidations
#[derive(Debug, Clone)]
pub struct MutationDispatcher {
    transport: Arc<dyn Transport>,
    catalog: Arc<ResourceCatalog>,
    cache: QueryCache,
}

impl MutationDispatcher {
    /// Create dispatcher over shared collaborators
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, catalog: Arc<ResourceCatalog>, cache: QueryCache) -> Self {
        Self {
            transport,
            catalog,
            cache,
        }
    }

    /// Send `mutation`; on success invalidate its planned keys
    ///
    /// Returns the server response body.
    ///
    /// # Errors
    /// - `QueryError::UnknownResource` or `QueryError::InvalidRecordId` before
    ///   any request is made
    /// - `QueryError::Mutation` if the write fails; no key is invalidated
    pub async fn dispatch(&self, mutation: Mutation) -> QueryResult<Value> {
        let path = mutation.path(&self.catalog)?;
        let method = mutation.kind.method();
        let invalidations = mutation.planned_invalidations(&self.catalog);

        tracing::debug!(resource = %mutation.resource, %method, %path, "dispatching mutation");
        let response = self
            .transport
            .request(method, &path, mutation.body.as_ref())
            .await
            .map_err(|source| QueryError::Mutation {
                resource: mutation.resource.clone(),
                source,
            })?;

        for key in &invalidations {
            self.cache.invalidate(key).await;
        }
        tracing::debug!(
            resource = %mutation.resource,
            invalidated = invalidations.len(),
            "mutation applied"
        );
        Ok(response)
    }
}
