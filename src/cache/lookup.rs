//! Cache Lookup Module
//!
//! Tagged result of a cache read. A miss is a normal outcome, not an error.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

/// A value served from cache together with the time it was written.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedValue {
    pub value: Value,
    pub cached_at: DateTime<Utc>,
}

impl CachedValue {
    /// How long ago the value was written, relative to `now`.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.cached_at
    }
}

/// Outcome of [`CacheStore::get`](crate::cache::CacheStore::get).
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Hit(CachedValue),
    Miss,
}

impl CacheLookup {
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheLookup::Hit(_))
    }

    pub fn is_miss(&self) -> bool {
        matches!(self, CacheLookup::Miss)
    }

    /// Returns the cached payload, discarding the write timestamp.
    pub fn into_value(self) -> Option<Value> {
        match self {
            CacheLookup::Hit(hit) => Some(hit.value),
            CacheLookup::Miss => None,
        }
    }

    pub fn into_cached(self) -> Option<CachedValue> {
        match self {
            CacheLookup::Hit(hit) => Some(hit),
            CacheLookup::Miss => None,
        }
    }
}
