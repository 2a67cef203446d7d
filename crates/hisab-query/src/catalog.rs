//! Resource catalog
//!
//! Maps each [`ResourceKey`] to its REST path and to the keys a write to it
//! invalidates. The dependency lists live here so call sites declare a
//! mutation by resource, not by re-listing every derived view.

use crate::error::{QueryError, QueryResult};
use crate::key::ResourceKey;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How a single record is addressed under its collection path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordPath {
    /// `/transactions/17`
    #[default]
    Segment,
    /// `/transactions?id=eq.17` (PostgREST row filter)
    EqFilter,
}

impl RecordPath {
    /// Build the path of record `id` under `collection`
    #[must_use]
    pub fn format(self, collection: &str, id: &str) -> String {
        match self {
            Self::Segment => format!("{}/{id}", collection.trim_end_matches('/')),
            Self::EqFilter => format!("{collection}?id=eq.{id}"),
        }
    }
}

/// Catalog entry for one resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSpec {
    /// Logical key
    pub key: ResourceKey,
    /// Collection path relative to the API base URL
    pub path: String,
    /// Keys to invalidate after a successful write (besides `key` itself)
    pub dependents: Vec<ResourceKey>,
}

impl ResourceSpec {
    /// Create spec with no extra dependents
    #[inline]
    #[must_use]
    pub fn new(key: ResourceKey, path: impl Into<String>) -> Self {
        Self {
            key,
            path: path.into(),
            dependents: Vec::new(),
        }
    }

    /// With dependent keys
    #[must_use]
    pub fn invalidates(mut self, keys: impl IntoIterator<Item = ResourceKey>) -> Self {
        self.dependents.extend(keys);
        self
    }
}

/// Registry of known resources
#[derive(Debug, Clone, Default)]
pub struct ResourceCatalog {
    resources: HashMap<ResourceKey, ResourceSpec>,
    record_path: RecordPath,
}

impl ResourceCatalog {
    /// Create empty catalog
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog of the bookkeeping application's resources
    ///
    /// A transaction moves project balances and the dashboard totals, so it
    /// invalidates both; expense types are embedded in transaction listings.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut catalog = Self::new();
        catalog.register(
            ResourceSpec::new(ResourceKey::TRANSACTIONS, "/transactions")
                .invalidates([ResourceKey::DASHBOARD, ResourceKey::PROJECTS]),
        );
        catalog.register(
            ResourceSpec::new(ResourceKey::PROJECTS, "/projects").invalidates([ResourceKey::DASHBOARD]),
        );
        catalog.register(
            ResourceSpec::new(ResourceKey::EMPLOYEES, "/employees").invalidates([ResourceKey::DASHBOARD]),
        );
        catalog.register(ResourceSpec::new(ResourceKey::DOCUMENTS, "/documents"));
        catalog.register(ResourceSpec::new(ResourceKey::USERS, "/users"));
        catalog.register(
            ResourceSpec::new(ResourceKey::EXPENSE_TYPES, "/expense_types")
                .invalidates([ResourceKey::TRANSACTIONS]),
        );
        catalog.register(ResourceSpec::new(ResourceKey::DASHBOARD, "/dashboard_stats"));
        catalog
    }

    /// With record addressing style
    #[inline]
    #[must_use]
    pub fn with_record_path(mut self, record_path: RecordPath) -> Self {
        self.record_path = record_path;
        self
    }

    /// Register or replace a resource
    pub fn register(&mut self, spec: ResourceSpec) {
        self.resources.insert(spec.key.clone(), spec);
    }

    /// Look up a resource
    ///
    /// # Errors
    /// - `QueryError::UnknownResource` if `key` is not registered
    pub fn spec(&self, key: &ResourceKey) -> QueryResult<&ResourceSpec> {
        self.resources
            .get(key)
            .ok_or_else(|| QueryError::UnknownResource(key.clone()))
    }

    /// Collection path of `key`
    ///
    /// # Errors
    /// - `QueryError::UnknownResource` if `key` is not registered
    pub fn path(&self, key: &ResourceKey) -> QueryResult<&str> {
        self.spec(key).map(|spec| spec.path.as_str())
    }

    /// Path of record `id` in collection `key`
    ///
    /// # Errors
    /// - `QueryError::UnknownResource` if `key` is not registered
    /// - `QueryError::InvalidRecordId` unless `id` is 1-64 chars of ASCII
    ///   letters, digits, `-` and `_`
    pub fn record_path(&self, key: &ResourceKey, id: &str) -> QueryResult<String> {
        let path = self.path(key)?;
        check_record_id(id)?;
        Ok(self.record_path.format(path, id))
    }

    /// Keys invalidated by a write to `key`, starting with `key` itself
    ///
    /// Unregistered keys invalidate only themselves.
    #[must_use]
    pub fn dependents(&self, key: &ResourceKey) -> Vec<ResourceKey> {
        let mut keys = vec![key.clone()];
        if let Some(spec) = self.resources.get(key) {
            for dep in &spec.dependents {
                if !keys.contains(dep) {
                    keys.push(dep.clone());
                }
            }
        }
        keys
    }

    /// Check if `key` is registered
    #[inline]
    #[must_use]
    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.resources.contains_key(key)
    }

    /// Registered keys, sorted
    #[must_use]
    pub fn keys(&self) -> Vec<&ResourceKey> {
        let mut keys: Vec<_> = self.resources.keys().collect();
        keys.sort();
        keys
    }

    /// Get number of registered resources
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Check if catalog is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

fn check_record_id(id: &str) -> QueryResult<()> {
    if id.is_empty() || id.len() > 64 {
        return Err(QueryError::invalid_record_id(id, "length must be 1-64"));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(QueryError::invalid_record_id(
            id,
            "only letters, digits, '-' and '_' are allowed",
        ));
    }
    Ok(())
}
