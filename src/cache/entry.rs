//! Cache Entry Module
//!
//! Defines the persisted cache row and its expiry predicates.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

// == Cache Entry ==
/// A single row of the cache table.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct CacheEntry {
    /// Unique key, `{domain}:{identifier}:{variant}` by convention
    pub key: String,
    /// Opaque JSON payload owned by the caller
    pub value: Value,
    /// Absolute expiry; the entry is valid while `now < expires_at`
    pub expires_at: DateTime<Utc>,
    /// Set on first insert
    pub created_at: DateTime<Utc>,
    /// Bumped on every upsert
    pub updated_at: DateTime<Utc>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a freshly inserted entry expiring at `expires_at`.
    pub fn new(key: impl Into<String>, value: Value, expires_at: DateTime<Utc>) -> Self {
        let now = Utc::now();
        Self {
            key: key.into(),
            value,
            expires_at,
            created_at: now,
            updated_at: now,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now`.
    ///
    /// Boundary condition: an entry whose `expires_at` equals `now` is expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Checks if the entry has expired right now.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    // == Time To Live ==
    /// Returns remaining TTL in whole seconds at `now`, clamped at 0.
    pub fn ttl_remaining_at(&self, now: DateTime<Utc>) -> u64 {
        (self.expires_at - now).num_seconds().max(0) as u64
    }
}
