//! Resource query cache using moka
//!
//! One entry per [`ResourceKey`], holding an ordered list of JSON records
//! and the instant they were fetched.
//!
//! # Entry lifecycle
//!
//! ```text
//! Empty --get--> Loading --resolved--> Fresh --window elapsed / invalidate--> Stale
//!                   ^                                                           |
//!                   +---------------------------get-----------------------------+
//! ```
//!
//! - Concurrent `get_or_fetch` calls for one key share a single fetch
//!   (moka's `try_get_with` init coalescing).
//! - Freshness is measured from the fetch instant by [`FreshnessWindow`];
//!   local patches keep the original instant and so never extend it.
//! - A failed fetch inserts nothing, so the entry stays Empty or Stale.
//! - An invalidated or expired entry is never returned.
//! - A fetch that was in flight when its key was invalidated still answers
//!   its callers, but its result is not kept for later readers.

use crate::error::TransportError;
use crate::key::ResourceKey;
use dashmap::{DashMap, DashSet};
use moka::future::Cache;
use moka::ops::compute::{CompResult, Op};
use moka::Expiry;
use serde_json::Value;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default freshness window
pub const DEFAULT_FRESHNESS: Duration = Duration::from_secs(300);

/// Default maximum number of cached resources
pub const DEFAULT_MAX_CAPACITY: u64 = 256;

/// Observable state of a cache entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// Never fetched
    Empty,
    /// A fetch is in flight and no fresh payload exists
    Loading,
    /// Payload present and inside its freshness window
    Fresh,
    /// Fetched before, but expired or invalidated
    Stale,
}

/// Cached payload of one resource
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    records: Vec<Value>,
    fetched_at: Instant,
}

impl CacheEntry {
    /// Create entry fetched now
    #[inline]
    #[must_use]
    pub fn new(records: Vec<Value>) -> Self {
        Self {
            records,
            fetched_at: Instant::now(),
        }
    }

    /// Build entry from a response body
    ///
    /// Arrays become the record list, `null` an empty list, and any other
    /// value a single record.
    #[must_use]
    pub fn from_payload(payload: Value) -> Self {
        let records = match payload {
            Value::Array(records) => records,
            Value::Null => Vec::new(),
            other => vec![other],
        };
        Self::new(records)
    }

    /// Cached records in server order
    #[inline]
    #[must_use]
    pub fn records(&self) -> &[Value] {
        &self.records
    }

    /// Number of records
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the collection is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// When the payload was fetched
    #[inline]
    #[must_use]
    pub fn fetched_at(&self) -> Instant {
        self.fetched_at
    }

    /// Time since fetch
    #[inline]
    #[must_use]
    pub fn age(&self) -> Duration {
        self.fetched_at.elapsed()
    }

    fn patched(&self, records: Vec<Value>) -> Self {
        Self {
            records,
            fetched_at: self.fetched_at,
        }
    }
}

/// Expires entries a fixed window after their fetch instant
#[derive(Debug, Clone, Copy)]
pub struct FreshnessWindow(pub Duration);

impl FreshnessWindow {
    fn remaining(&self, entry: &CacheEntry, now: Instant) -> Duration {
        self.0
            .saturating_sub(now.saturating_duration_since(entry.fetched_at))
    }
}

impl Expiry<ResourceKey, Arc<CacheEntry>> for FreshnessWindow {
    fn expire_after_create(
        &self,
        _key: &ResourceKey,
        value: &Arc<CacheEntry>,
        created_at: Instant,
    ) -> Option<Duration> {
        Some(self.remaining(value, created_at))
    }

    fn expire_after_update(
        &self,
        _key: &ResourceKey,
        value: &Arc<CacheEntry>,
        updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(self.remaining(value, updated_at))
    }
}

/// Statistics for cache monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Approximate number of live entries
    pub entry_count: u64,
    /// Keys with a fetch in flight
    pub loading: usize,
    /// Keys fetched at least once
    pub known: usize,
}

/// Read-through cache of resource collections
///
/// Cloning is cheap and shares the underlying store.
#[derive(Debug, Clone)]
pub struct QueryCache {
    inner: Cache<ResourceKey, Arc<CacheEntry>>,
    loading: Arc<DashMap<ResourceKey, usize>>,
    known: Arc<DashSet<ResourceKey>>,
    generations: Arc<DashMap<ResourceKey, u64>>,
    epoch: Arc<AtomicU64>,
    freshness: Duration,
}

impl QueryCache {
    /// Create cache with capacity and freshness window
    #[must_use]
    pub fn new(max_capacity: u64, freshness: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .expire_after(FreshnessWindow(freshness))
                .build(),
            loading: Arc::new(DashMap::new()),
            known: Arc::new(DashSet::new()),
            generations: Arc::new(DashMap::new()),
            epoch: Arc::new(AtomicU64::new(0)),
            freshness,
        }
    }

    /// Configured freshness window
    #[inline]
    #[must_use]
    pub fn freshness(&self) -> Duration {
        self.freshness
    }

    /// Fresh entry for `key`, without fetching
    #[inline]
    pub async fn peek(&self, key: &ResourceKey) -> Option<Arc<CacheEntry>> {
        self.inner.get(key).await
    }

    /// Return the fresh entry or run `fetch` and cache its result
    ///
    /// Callers arriving while a fetch for `key` is in flight wait for that
    /// fetch instead of starting their own; their `fetch` future is dropped
    /// unpolled.
    ///
    /// # Errors
    /// The fetch error, shared between all coalesced callers. Nothing is
    /// inserted on failure.
    pub async fn get_or_fetch<Fut>(
        &self,
        key: &ResourceKey,
        fetch: Fut,
    ) -> Result<Arc<CacheEntry>, Arc<TransportError>>
    where
        Fut: Future<Output = Result<Value, TransportError>>,
    {
        if let Some(entry) = self.inner.get(key).await {
            tracing::trace!(%key, "cache hit");
            return Ok(entry);
        }

        let mut started = None;
        let init = async {
            started = Some(self.generation(key));
            let _loading = LoadingGuard::new(&self.loading, key);
            tracing::debug!(%key, "fetching");
            let payload = fetch.await?;
            self.known.insert(key.clone());
            Ok(Arc::new(CacheEntry::from_payload(payload)))
        };
        let entry = self.inner.try_get_with_by_ref(key, init).await?;

        if started.is_some_and(|generation| generation != self.generation(key)) {
            tracing::debug!(%key, "invalidated while fetching; result not kept");
            self.inner.invalidate(key).await;
        }
        Ok(entry)
    }

    /// Run `fetch` unconditionally and replace the entry with its result
    ///
    /// # Errors
    /// The fetch error; the existing entry is left as it was.
    pub async fn refetch<Fut>(&self, key: &ResourceKey, fetch: Fut) -> Result<Arc<CacheEntry>, TransportError>
    where
        Fut: Future<Output = Result<Value, TransportError>>,
    {
        let started = self.generation(key);
        let payload = {
            let _loading = LoadingGuard::new(&self.loading, key);
            tracing::debug!(%key, "refetching");
            fetch.await?
        };
        let entry = Arc::new(CacheEntry::from_payload(payload));
        self.known.insert(key.clone());
        if started == self.generation(key) {
            self.inner.insert(key.clone(), Arc::clone(&entry)).await;
        } else {
            tracing::debug!(%key, "invalidated while refetching; result not kept");
        }
        Ok(entry)
    }

    /// Store a payload directly, as if just fetched
    pub async fn insert(&self, key: ResourceKey, payload: Value) -> Arc<CacheEntry> {
        let entry = Arc::new(CacheEntry::from_payload(payload));
        self.known.insert(key.clone());
        self.inner.insert(key, Arc::clone(&entry)).await;
        entry
    }

    /// Mark `key` stale; the next get fetches again
    ///
    /// Issues no request.
    pub async fn invalidate(&self, key: &ResourceKey) {
        tracing::debug!(%key, "invalidated");
        *self.generations.entry(key.clone()).or_insert(0) += 1;
        self.inner.invalidate(key).await;
    }

    /// Mark every entry stale
    pub fn invalidate_all(&self) {
        tracing::debug!("invalidated all entries");
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.inner.invalidate_all();
    }

    /// Invalidation counter for `key`; changes whenever `key` is invalidated
    fn generation(&self, key: &ResourceKey) -> u64 {
        let own = self.generations.get(key).map_or(0, |g| *g);
        self.epoch.load(Ordering::Acquire).wrapping_add(own)
    }

    /// Current lifecycle state of `key`
    #[must_use]
    pub fn state(&self, key: &ResourceKey) -> EntryState {
        if self.inner.contains_key(key) {
            EntryState::Fresh
        } else if self.loading.contains_key(key) {
            EntryState::Loading
        } else if self.known.contains(key) {
            EntryState::Stale
        } else {
            EntryState::Empty
        }
    }

    /// Append `record` to the cached collection
    ///
    /// Returns `false` (and changes nothing) when no fresh entry exists.
    pub async fn add_record(&self, key: &ResourceKey, record: Value) -> bool {
        self.patch(key, move |records| {
            records.push(record);
            true
        })
        .await
    }

    /// Remove every record whose `id` matches
    ///
    /// Returns `true` if a record was removed.
    pub async fn remove_record(&self, key: &ResourceKey, id: &Value) -> bool {
        self.patch(key, |records| {
            let before = records.len();
            records.retain(|record| !record_has_id(record, id));
            records.len() != before
        })
        .await
    }

    /// Apply `changes` to the record whose `id` matches
    ///
    /// Object changes are merged field by field into an object record; any
    /// other value replaces the record. Returns `true` if a record matched.
    pub async fn update_record(&self, key: &ResourceKey, id: &Value, changes: Value) -> bool {
        self.patch(key, move |records| {
            let Some(record) = records.iter_mut().find(|r| record_has_id(r, id)) else {
                return false;
            };
            match (record, changes) {
                (Value::Object(fields), Value::Object(updates)) => {
                    fields.extend(updates);
                }
                (record, replacement) => *record = replacement,
            }
            true
        })
        .await
    }

    async fn patch<F>(&self, key: &ResourceKey, edit: F) -> bool
    where
        F: FnOnce(&mut Vec<Value>) -> bool,
    {
        let result = self
            .inner
            .entry_by_ref(key)
            .and_compute_with(|current| {
                let op = match current {
                    Some(entry) => {
                        let cached = entry.into_value();
                        let mut records = cached.records.clone();
                        if edit(&mut records) {
                            Op::Put(Arc::new(cached.patched(records)))
                        } else {
                            Op::Nop
                        }
                    }
                    None => Op::Nop,
                };
                std::future::ready(op)
            })
            .await;

        let patched = matches!(result, CompResult::ReplacedWith(_));
        tracing::trace!(%key, patched, "local patch");
        patched
    }

    /// Get cache statistics
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.inner.entry_count(),
            loading: self.loading.len(),
            known: self.known.len(),
        }
    }
}

impl Default for QueryCache {
    /// Create cache with default capacity and freshness window
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CAPACITY, DEFAULT_FRESHNESS)
    }
}

/// Marks a key as loading for as long as it lives
///
/// Dropped when the fetch resolves or the fetching future is abandoned.
struct LoadingGuard<'a> {
    loading: &'a DashMap<ResourceKey, usize>,
    key: ResourceKey,
}

impl<'a> LoadingGuard<'a> {
    fn new(loading: &'a DashMap<ResourceKey, usize>, key: &ResourceKey) -> Self {
        *loading.entry(key.clone()).or_insert(0) += 1;
        Self {
            loading,
            key: key.clone(),
        }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.loading.remove_if_mut(&self.key, |_, count| {
            *count -= 1;
            *count == 0
        });
    }
}

/// Compare a record's `id` with `id`, treating `7` and `"7"` as equal
fn record_has_id(record: &Value, id: &Value) -> bool {
    let Some(own) = record.get("id") else {
        return false;
    };
    own == id || matches!((plain_id(own), plain_id(id)), (Some(a), Some(b)) if a == b)
}

fn plain_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ok(payload: Value) -> impl Future<Output = Result<Value, TransportError>> {
        std::future::ready(Ok(payload))
    }

    #[test]
    fn payload_normalization() {
        assert_eq!(CacheEntry::from_payload(json!([1, 2])).len(), 2);
        assert!(CacheEntry::from_payload(Value::Null).is_empty());
        assert_eq!(
            CacheEntry::from_payload(json!({"income": 10})).records(),
            &[json!({"income": 10})]
        );
    }

    #[test]
    fn ids_compare_loosely() {
        assert!(record_has_id(&json!({"id": 7}), &json!(7)));
        assert!(record_has_id(&json!({"id": 7}), &json!("7")));
        assert!(record_has_id(&json!({"id": "a-1"}), &json!("a-1")));
        assert!(!record_has_id(&json!({"id": 7}), &json!(8)));
        assert!(!record_has_id(&json!({"name": "x"}), &json!(7)));
    }

    #[test]
    fn freshness_window_remaining() {
        let window = FreshnessWindow(Duration::from_secs(10));
        let entry = CacheEntry::new(Vec::new());
        let later = entry.fetched_at() + Duration::from_secs(4);
        assert_eq!(window.remaining(&entry, later), Duration::from_secs(6));
        let much_later = entry.fetched_at() + Duration::from_secs(40);
        assert_eq!(window.remaining(&entry, much_later), Duration::ZERO);
    }

    #[tokio::test]
    async fn state_transitions() {
        let cache = QueryCache::default();
        let key = ResourceKey::PROJECTS;
        assert_eq!(cache.state(&key), EntryState::Empty);

        cache.get_or_fetch(&key, ok(json!([{"id": 1}]))).await.unwrap();
        assert_eq!(cache.state(&key), EntryState::Fresh);

        cache.invalidate(&key).await;
        assert_eq!(cache.state(&key), EntryState::Stale);
        assert!(cache.peek(&key).await.is_none());
    }

    #[tokio::test]
    async fn failed_fetch_inserts_nothing() {
        let cache = QueryCache::default();
        let key = ResourceKey::USERS;
        let err = cache
            .get_or_fetch(&key, std::future::ready(Err(TransportError::Timeout)))
            .await
            .unwrap_err();
        assert_eq!(*err, TransportError::Timeout);
        assert_eq!(cache.state(&key), EntryState::Empty);
    }

    #[tokio::test]
    async fn patches_edit_fresh_entry() {
        let cache = QueryCache::default();
        let key = ResourceKey::TRANSACTIONS;
        cache
            .insert(key.clone(), json!([{"id": 1, "amount": 100}, {"id": 2, "amount": 50}]))
            .await;

        assert!(cache.add_record(&key, json!({"id": 3, "amount": 5})).await);
        assert!(cache.update_record(&key, &json!(1), json!({"amount": 120})).await);
        assert!(cache.remove_record(&key, &json!("2")).await);
        assert!(!cache.remove_record(&key, &json!(99)).await);

        let entry = cache.peek(&key).await.unwrap();
        assert_eq!(
            entry.records(),
            &[json!({"id": 1, "amount": 120}), json!({"id": 3, "amount": 5})]
        );
    }

    #[tokio::test]
    async fn patch_keeps_fetch_instant() {
        let cache = QueryCache::default();
        let key = ResourceKey::DOCUMENTS;
        let original = cache.insert(key.clone(), json!([])).await;
        cache.add_record(&key, json!({"id": 1})).await;
        let patched = cache.peek(&key).await.unwrap();
        assert_eq!(patched.fetched_at(), original.fetched_at());
    }

    #[tokio::test]
    async fn invalidate_during_fetch_discards_result() {
        let cache = QueryCache::default();
        let key = ResourceKey::USERS;
        let fetch = async {
            cache.invalidate(&key).await;
            Ok::<_, TransportError>(json!([{"id": 1}]))
        };

        let entry = cache.get_or_fetch(&key, fetch).await.unwrap();

        assert_eq!(entry.len(), 1);
        assert_eq!(cache.state(&key), EntryState::Stale);
        assert!(cache.peek(&key).await.is_none());
    }

    #[tokio::test]
    async fn invalidate_all_during_refetch_keeps_entry_stale() {
        let cache = QueryCache::default();
        let key = ResourceKey::PROJECTS;
        cache.insert(key.clone(), json!([{"id": 1}])).await;
        let fetch = async {
            cache.invalidate_all();
            Ok::<_, TransportError>(json!([{"id": 1}, {"id": 2}]))
        };

        let entry = cache.refetch(&key, fetch).await.unwrap();

        assert_eq!(entry.len(), 2);
        assert_eq!(cache.state(&key), EntryState::Stale);
    }

    #[tokio::test]
    async fn fetch_after_invalidation_is_kept() {
        let cache = QueryCache::default();
        let key = ResourceKey::DOCUMENTS;
        cache.invalidate(&key).await;
        cache.get_or_fetch(&key, ok(json!([]))).await.unwrap();
        assert_eq!(cache.state(&key), EntryState::Fresh);
    }

    #[tokio::test]
    async fn patch_on_missing_entry_is_noop() {
        let cache = QueryCache::default();
        let key = ResourceKey::EMPLOYEES;
        assert!(!cache.add_record(&key, json!({"id": 1})).await);
        assert_eq!(cache.state(&key), EntryState::Empty);
    }
}
