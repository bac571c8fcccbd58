//! Cache Store Module
//!
//! Best-effort TTL cache over a persistent key/value/expiry table. Reads never
//! fail: backend errors, absent rows and expired rows all come back as
//! [`CacheLookup::Miss`]. Writes report failure to the caller but never panic.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::backend::CacheBackend;
use crate::cache::{
    CacheLookup, CacheStats, CachedValue, KeyPattern, StatsSnapshot, MAX_KEY_LENGTH,
};
use crate::error::{CacheError, Result};

// == Cache Store ==
/// Cheap-to-clone handle; clones share the backend and the stats counters.
#[derive(Clone)]
pub struct CacheStore {
    /// Injected persistence client
    backend: Arc<dyn CacheBackend>,
    /// Process-local counters
    stats: Arc<CacheStats>,
    /// Default TTL in seconds for writes without explicit TTL
    default_ttl: u64,
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("default_ttl", &self.default_ttl)
            .finish_non_exhaustive()
    }
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new CacheStore over `backend`.
    ///
    /// # Arguments
    /// * `backend` - Persistence client, created once at process start
    /// * `default_ttl` - Default TTL in seconds for writes without explicit TTL
    pub fn new(backend: Arc<dyn CacheBackend>, default_ttl: u64) -> Self {
        Self {
            backend,
            stats: Arc::new(CacheStats::new()),
            default_ttl,
        }
    }

    pub fn backend(&self) -> &Arc<dyn CacheBackend> {
        &self.backend
    }

    pub fn default_ttl(&self) -> u64 {
        self.default_ttl
    }

    // == Get ==
    /// Retrieves a value by exact key.
    ///
    /// An expired row is deleted as a side effect and reported as a miss.
    /// Backend errors are logged and reported as a miss.
    pub async fn get(&self, key: &str) -> CacheLookup {
        let entry = match self.backend.fetch(key).await {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                self.stats.record_miss();
                return CacheLookup::Miss;
            }
            Err(e) => {
                warn!("Cache read failed for '{}', treating as miss: {}", key, e);
                self.stats.record_read_error();
                self.stats.record_miss();
                return CacheLookup::Miss;
            }
        };

        let now = Utc::now();
        if entry.is_expired_at(now) {
            debug!("Cache entry '{}' expired at {}, evicting", key, entry.expires_at);
            match self.backend.delete_if_expired(key, now).await {
                Ok(true) => self.stats.record_expired_eviction(),
                Ok(false) => debug!("Cache entry '{}' was refreshed before eviction", key),
                Err(e) => warn!("Failed to evict expired cache entry '{}': {}", key, e),
            }
            self.stats.record_miss();
            return CacheLookup::Miss;
        }

        self.stats.record_hit();
        CacheLookup::Hit(CachedValue {
            value: entry.value,
            cached_at: entry.updated_at,
        })
    }

    /// Retrieves and decodes a value.
    ///
    /// A payload that does not decode as `T` is logged and counted as a
    /// read error and a miss instead of a hit.
    pub async fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get(key).await.into_value()?;
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!("Cached payload for '{}' is malformed, treating as miss: {}", key, e);
                self.record_undecodable_hit();
                None
            }
        }
    }

    /// Re-counts a hit whose payload could not be decoded as a failed read.
    pub(crate) fn record_undecodable_hit(&self) {
        self.stats.reclassify_hit_as_miss();
        self.stats.record_read_error();
    }

    // == Set ==
    /// Stores a value, replacing any existing row for the key.
    ///
    /// # Arguments
    /// * `key` - The key to store
    /// * `value` - JSON payload
    /// * `ttl` - Optional TTL in seconds (uses default_ttl if None)
    pub async fn set(&self, key: &str, value: Value, ttl: Option<u64>) -> Result<()> {
        validate_key(key)?;
        let ttl = ttl.unwrap_or(self.default_ttl);
        let expires_at = expiry_after(Utc::now(), ttl)?;

        match self.backend.upsert(key, &value, expires_at).await {
            Ok(()) => {
                self.stats.record_write();
                debug!("Cached '{}' for {}s (expires {})", key, ttl, expires_at);
                Ok(())
            }
            Err(e) => {
                self.stats.record_write_failure();
                error!("Cache write failed for '{}': {}", key, e);
                Err(e)
            }
        }
    }

    /// Serializes `value` and stores it.
    pub async fn set_json<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<u64>,
    ) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.set(key, value, ttl).await
    }

    // == Delete ==
    /// Removes an entry by key. Absent keys and backend failures are not errors.
    pub async fn delete(&self, key: &str) {
        if let Err(e) = self.backend.delete(key).await {
            warn!("Cache delete failed for '{}': {}", key, e);
        }
    }

    // == Delete Pattern ==
    /// Removes every entry matching a trailing-wildcard pattern such as
    /// `crypto:BTC:*`.
    ///
    /// Returns the number of rows removed; invalid patterns and backend
    /// failures are logged and report 0.
    pub async fn delete_pattern(&self, pattern: &str) -> usize {
        match KeyPattern::parse(pattern) {
            Ok(parsed) => self.delete_matching(&parsed).await,
            Err(e) => {
                warn!("Ignoring cache pattern delete: {}", e);
                0
            }
        }
    }

    /// Removes every entry covered by an already parsed pattern.
    ///
    /// Keys are resolved first and deleted second; rows inserted in between
    /// are not covered.
    pub async fn delete_matching(&self, pattern: &KeyPattern) -> usize {
        let result = match pattern {
            KeyPattern::Exact(key) => self.backend.delete(key).await.map(usize::from),
            KeyPattern::Prefix(prefix) => match self.backend.keys_with_prefix(prefix).await {
                Ok(keys) if keys.is_empty() => Ok(0),
                Ok(keys) => self
                    .backend
                    .delete_many(&keys)
                    .await
                    .map(|removed| removed as usize),
                Err(e) => Err(e),
            },
        };

        match result {
            Ok(removed) => {
                info!("Invalidated {} cache entries matching '{}'", removed, pattern);
                removed
            }
            Err(e) => {
                warn!("Cache pattern delete failed for '{}': {}", pattern, e);
                0
            }
        }
    }

    // == Cleanup ==
    /// Removes all expired entries. Failures are logged and report 0.
    pub async fn cleanup(&self) -> usize {
        match self.try_cleanup().await {
            Ok(removed) => removed,
            Err(e) => {
                warn!("Cache cleanup failed: {}", e);
                0
            }
        }
    }

    /// Removes all expired entries, surfacing backend failures.
    pub async fn try_cleanup(&self) -> Result<usize> {
        let removed = self.backend.delete_expired(Utc::now()).await?;
        Ok(removed as usize)
    }

    // == Stats ==
    /// Returns current process statistics.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Connectivity check against the backend.
    pub async fn ping(&self) -> Result<()> {
        self.backend.ping().await
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidRequest("Key cannot be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidRequest(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}

/// Computes `now + ttl_secs`, rejecting zero and out-of-range TTLs.
pub(crate) fn expiry_after(now: DateTime<Utc>, ttl_secs: u64) -> Result<DateTime<Utc>> {
    if ttl_secs == 0 {
        return Err(CacheError::InvalidRequest("TTL must be at least 1 second".to_string()));
    }
    i64::try_from(ttl_secs)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| CacheError::InvalidRequest(format!("TTL of {}s is out of range", ttl_secs)))
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{EntryFilter, MemoryBackend};
    use async_trait::async_trait;
    use serde::Deserialize;
    use serde_json::json;

    use crate::cache::CacheEntry;

    fn create_store() -> (CacheStore, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        (CacheStore::new(backend.clone(), 3600), backend)
    }

    /// Backend whose every call fails.
    struct FailingBackend;

    #[async_trait]
    impl CacheBackend for FailingBackend {
        async fn fetch(&self, _key: &str) -> Result<Option<CacheEntry>> {
            Err(CacheError::Backend("connection refused".into()))
        }
        async fn upsert(&self, _key: &str, _value: &Value, _at: DateTime<Utc>) -> Result<()> {
            Err(CacheError::Backend("connection refused".into()))
        }
        async fn delete(&self, _key: &str) -> Result<bool> {
            Err(CacheError::Backend("connection refused".into()))
        }
        async fn delete_if_expired(&self, _key: &str, _now: DateTime<Utc>) -> Result<bool> {
            Err(CacheError::Backend("connection refused".into()))
        }
        async fn delete_many(&self, _keys: &[String]) -> Result<u64> {
            Err(CacheError::Backend("connection refused".into()))
        }
        async fn delete_expired(&self, _now: DateTime<Utc>) -> Result<u64> {
            Err(CacheError::Backend("connection refused".into()))
        }
        async fn keys_with_prefix(&self, _prefix: &str) -> Result<Vec<String>> {
            Err(CacheError::Backend("connection refused".into()))
        }
        async fn count(&self, _filter: &EntryFilter, _now: DateTime<Utc>) -> Result<u64> {
            Err(CacheError::Backend("connection refused".into()))
        }
        async fn list(
            &self,
            _filter: &EntryFilter,
            _now: DateTime<Utc>,
            _limit: Option<usize>,
        ) -> Result<Vec<CacheEntry>> {
            Err(CacheError::Backend("connection refused".into()))
        }
        async fn ping(&self) -> Result<()> {
            Err(CacheError::Backend("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn test_store_set_and_get() {
        let (store, _) = create_store();

        store.set("crypto:BTC:full", json!({"price": 42000}), Some(21600)).await.unwrap();
        let lookup = store.get("crypto:BTC:full").await;

        assert_eq!(lookup.into_value(), Some(json!({"price": 42000})));
    }

    #[tokio::test]
    async fn test_store_get_nonexistent() {
        let (store, _) = create_store();
        assert!(store.get("nonexistent").await.is_miss());
        assert_eq!(store.stats().misses, 1);
    }

    #[tokio::test]
    async fn test_store_default_ttl_applied() {
        let (store, backend) = create_store();
        let before = Utc::now();

        store.set("k", json!(1), None).await.unwrap();

        let row = backend.row("k").await.unwrap();
        let ttl = (row.expires_at - before).num_seconds();
        assert!((3599..=3601).contains(&ttl), "unexpected ttl {}", ttl);
    }

    #[tokio::test]
    async fn test_store_expired_read_evicts_row() {
        let (store, backend) = create_store();

        store.set("k", json!("v"), Some(60)).await.unwrap();
        backend.set_expires_at("k", Utc::now() - Duration::seconds(1)).await;

        assert!(store.get("k").await.is_miss());
        assert!(!backend.contains("k").await, "expired row should be deleted");
        assert_eq!(store.stats().expired_evictions, 1);
    }

    #[tokio::test]
    async fn test_store_ttl_expiration() {
        let (store, _) = create_store();

        store.set("k", json!("v"), Some(1)).await.unwrap();
        assert!(store.get("k").await.is_hit());

        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;

        assert!(store.get("k").await.is_miss());
    }

    #[tokio::test]
    async fn test_store_overwrite_keeps_single_row() {
        let (store, backend) = create_store();

        store.set("k", json!("v1"), Some(60)).await.unwrap();
        let before = Utc::now();
        store.set("k", json!("v2"), Some(7200)).await.unwrap();

        assert_eq!(backend.len().await, 1);
        let row = backend.row("k").await.unwrap();
        assert_eq!(row.value, json!("v2"));
        let ttl = (row.expires_at - before).num_seconds();
        assert!((7199..=7201).contains(&ttl));
    }

    #[tokio::test]
    async fn test_store_delete_is_idempotent() {
        let (store, backend) = create_store();

        store.set("keep", json!(1), None).await.unwrap();
        store.delete("absent").await;

        assert_eq!(backend.len().await, 1);
        assert!(store.get("keep").await.is_hit());
    }

    #[tokio::test]
    async fn test_store_delete_pattern_scope() {
        let (store, backend) = create_store();
        for key in ["crypto:BTC:full", "crypto:BTC:prediction", "crypto:ETH:full"] {
            store.set(key, json!({}), None).await.unwrap();
        }

        let removed = store.delete_pattern("crypto:BTC:*").await;

        assert_eq!(removed, 2);
        assert!(!backend.contains("crypto:BTC:full").await);
        assert!(!backend.contains("crypto:BTC:prediction").await);
        assert!(backend.contains("crypto:ETH:full").await);
    }

    #[tokio::test]
    async fn test_store_delete_pattern_exact_and_invalid() {
        let (store, backend) = create_store();
        store.set("a:b:c", json!(1), None).await.unwrap();

        assert_eq!(store.delete_pattern("a:*:c").await, 0);
        assert!(backend.contains("a:b:c").await);

        assert_eq!(store.delete_pattern("a:b:c").await, 1);
        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn test_store_cleanup_expired() {
        let (store, backend) = create_store();

        store.set("old1", json!(1), None).await.unwrap();
        store.set("old2", json!(2), None).await.unwrap();
        store.set("fresh", json!({"keep": true}), None).await.unwrap();
        let past = Utc::now() - Duration::seconds(5);
        backend.set_expires_at("old1", past).await;
        backend.set_expires_at("old2", past).await;

        let removed = store.cleanup().await;

        assert_eq!(removed, 2);
        assert_eq!(backend.len().await, 1);
        assert_eq!(store.get("fresh").await.into_value(), Some(json!({"keep": true})));
    }

    #[tokio::test]
    async fn test_store_key_validation() {
        let (store, _) = create_store();

        assert!(matches!(
            store.set("", json!(1), None).await,
            Err(CacheError::InvalidRequest(_))
        ));
        let long_key = "x".repeat(MAX_KEY_LENGTH + 1);
        assert!(matches!(
            store.set(&long_key, json!(1), None).await,
            Err(CacheError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_store_ttl_validation() {
        let (store, _) = create_store();

        assert!(matches!(
            store.set("k", json!(1), Some(0)).await,
            Err(CacheError::InvalidRequest(_))
        ));
        assert!(matches!(
            store.set("k", json!(1), Some(u64::MAX)).await,
            Err(CacheError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_store_typed_helpers() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Prediction {
            symbol: String,
            day1: f64,
        }

        let (store, _) = create_store();
        let prediction = Prediction {
            symbol: "ETH".into(),
            day1: 3100.5,
        };

        store.set_json("crypto:ETH:prediction", &prediction, Some(7200)).await.unwrap();
        let decoded: Option<Prediction> = store.get_as("crypto:ETH:prediction").await;
        assert_eq!(decoded, Some(prediction));

        store.set("crypto:ETH:prediction", json!("not a struct"), None).await.unwrap();
        let malformed: Option<Prediction> = store.get_as("crypto:ETH:prediction").await;
        assert!(malformed.is_none());
    }

    #[tokio::test]
    async fn test_store_malformed_payload_counts_as_miss() {
        #[derive(Debug, Deserialize)]
        struct Price {
            #[allow(dead_code)]
            price: f64,
        }

        let (store, _) = create_store();
        store.set("crypto:BTC:full", json!("not an object"), None).await.unwrap();

        let decoded: Option<Price> = store.get_as("crypto:BTC:full").await;
        assert!(decoded.is_none());

        let stats = store.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.read_errors, 1);
        assert_eq!(stats.hit_rate, 0.0);
    }

    /// Serves a stale row, then lets another writer refresh the key before the
    /// reader gets to evict it.
    struct RefreshingBackend {
        inner: MemoryBackend,
    }

    #[async_trait]
    impl CacheBackend for RefreshingBackend {
        async fn fetch(&self, key: &str) -> Result<Option<CacheEntry>> {
            let stale = self.inner.fetch(key).await?;
            let refreshed_until = Utc::now() + Duration::hours(6);
            self.inner.upsert(key, &json!("fresh"), refreshed_until).await?;
            Ok(stale)
        }
        async fn upsert(&self, key: &str, value: &Value, at: DateTime<Utc>) -> Result<()> {
            self.inner.upsert(key, value, at).await
        }
        async fn delete(&self, key: &str) -> Result<bool> {
            self.inner.delete(key).await
        }
        async fn delete_if_expired(&self, key: &str, now: DateTime<Utc>) -> Result<bool> {
            self.inner.delete_if_expired(key, now).await
        }
        async fn delete_many(&self, keys: &[String]) -> Result<u64> {
            self.inner.delete_many(keys).await
        }
        async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
            self.inner.delete_expired(now).await
        }
        async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
            self.inner.keys_with_prefix(prefix).await
        }
        async fn count(&self, filter: &EntryFilter, now: DateTime<Utc>) -> Result<u64> {
            self.inner.count(filter, now).await
        }
        async fn list(
            &self,
            filter: &EntryFilter,
            now: DateTime<Utc>,
            limit: Option<usize>,
        ) -> Result<Vec<CacheEntry>> {
            self.inner.list(filter, now, limit).await
        }
        async fn ping(&self) -> Result<()> {
            self.inner.ping().await
        }
    }

    #[tokio::test]
    async fn test_store_eviction_spares_concurrently_refreshed_row() {
        let backend = Arc::new(RefreshingBackend {
            inner: MemoryBackend::new(),
        });
        let store = CacheStore::new(backend.clone(), 3600);

        store.set("crypto:BTC:full", json!("stale"), Some(60)).await.unwrap();
        backend
            .inner
            .set_expires_at("crypto:BTC:full", Utc::now() - Duration::seconds(1))
            .await;

        assert!(store.get("crypto:BTC:full").await.is_miss());

        let row = backend.inner.row("crypto:BTC:full").await;
        assert_eq!(row.map(|r| r.value), Some(json!("fresh")));
        assert_eq!(store.stats().expired_evictions, 0);
    }

    #[tokio::test]
    async fn test_store_read_failure_is_miss() {
        let store = CacheStore::new(Arc::new(FailingBackend), 3600);

        assert!(store.get("crypto:BTC:full").await.is_miss());
        let stats = store.stats();
        assert_eq!(stats.read_errors, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_store_write_failure_is_reported() {
        let store = CacheStore::new(Arc::new(FailingBackend), 3600);

        let result = store.set("k", json!(1), None).await;
        assert!(matches!(result, Err(CacheError::Backend(_))));
        assert_eq!(store.stats().write_failures, 1);
    }

    #[tokio::test]
    async fn test_store_maintenance_failures_are_swallowed() {
        let store = CacheStore::new(Arc::new(FailingBackend), 3600);

        store.delete("k").await;
        assert_eq!(store.delete_pattern("crypto:BTC:*").await, 0);
        assert_eq!(store.cleanup().await, 0);
        assert!(store.try_cleanup().await.is_err());
    }

    #[tokio::test]
    async fn test_store_clones_share_stats() {
        let (store, _) = create_store();
        let clone = store.clone();

        clone.set("k", json!(1), None).await.unwrap();
        store.get("k").await;

        assert_eq!(clone.stats().hits, 1);
        assert_eq!(store.stats().writes, 1);
    }
}
