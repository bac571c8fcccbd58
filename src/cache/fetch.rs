//! Cache-backed fetch
//!
//! `get` → on hit return it; on miss compute, `set`, return. A failed `set`
//! never hides the freshly computed value.
//!
//! There is no per-key lock: concurrent misses on the same key all compute
//! and all write, and the last write wins.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::{CacheLookup, CacheStore};

/// Where a [`Fetched`] value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchSource {
    Cache,
    Fresh,
}

/// Result of [`CacheStore::fetch_or_compute`].
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub value: T,
    pub source: FetchSource,
    /// Write time of the cached row; `None` for fresh values
    pub cached_at: Option<DateTime<Utc>>,
    /// Whether a fresh value was persisted
    pub cache_written: bool,
}

impl<T> Fetched<T> {
    pub fn from_cache(&self) -> bool {
        self.source == FetchSource::Cache
    }
}

impl CacheStore {
    /// Serves `key` from cache, or runs `compute` and caches its result for
    /// `ttl` seconds.
    ///
    /// Errors from `compute` are returned unchanged and nothing is written.
    /// A cached payload that no longer decodes as `T` is recomputed.
    pub async fn fetch_or_compute<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: u64,
        compute: F,
    ) -> Result<Fetched<T>, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let CacheLookup::Hit(hit) = self.get(key).await {
            match serde_json::from_value::<T>(hit.value) {
                Ok(value) => {
                    debug!("Serving '{}' from cache (written {})", key, hit.cached_at);
                    return Ok(Fetched {
                        value,
                        source: FetchSource::Cache,
                        cached_at: Some(hit.cached_at),
                        cache_written: false,
                    });
                }
                Err(e) => {
                    warn!("Cached payload for '{}' is malformed, recomputing: {}", key, e);
                    self.record_undecodable_hit();
                }
            }
        }

        let value = compute().await?;

        let cache_written = match self.set_json(key, &value, Some(ttl)).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Returning uncached result for '{}': {}", key, e);
                false
            }
        };

        Ok(Fetched {
            value,
            source: FetchSource::Fresh,
            cached_at: None,
            cache_written,
        })
    }
}
