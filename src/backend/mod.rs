//! Persistence Backend Module
//!
//! The table-like contract the cache store consumes. The store never talks to
//! a database directly; it is handed an `Arc<dyn CacheBackend>` at construction.
//!
//! # Implementations
//! - [`PostgresBackend`] - `cache` table accessed through a sqlx pool
//! - [`MemoryBackend`] - in-process table for tests and local runs

mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::CacheEntry;
use crate::error::Result;

pub use memory::MemoryBackend;
pub use postgres::{escape_like, PostgresBackend};

// == Entry Filter ==
/// Expiry state used to filter counts and listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpiryState {
    #[default]
    All,
    /// `expires_at > now`
    Valid,
    /// `expires_at <= now`
    Expired,
}

impl ExpiryState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpiryState::All => "all",
            ExpiryState::Valid => "valid",
            ExpiryState::Expired => "expired",
        }
    }

    /// Returns true if a row expiring at `expires_at` is in this state at `now`.
    pub fn admits(&self, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self {
            ExpiryState::All => true,
            ExpiryState::Valid => expires_at > now,
            ExpiryState::Expired => expires_at <= now,
        }
    }
}

/// Row filter for [`CacheBackend::count`] and [`CacheBackend::list`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryFilter {
    pub state: ExpiryState,
    /// Only keys starting with this prefix
    pub prefix: Option<String>,
}

impl EntryFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn valid() -> Self {
        Self {
            state: ExpiryState::Valid,
            prefix: None,
        }
    }

    pub fn expired() -> Self {
        Self {
            state: ExpiryState::Expired,
            prefix: None,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn matches(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        let prefix_ok = self
            .prefix
            .as_deref()
            .map_or(true, |prefix| entry.key.starts_with(prefix));
        prefix_ok && self.state.admits(entry.expires_at, now)
    }
}

// == Backend Trait ==
/// Key/value/expiry table operations. No transactions span these calls.
#[async_trait]
pub trait CacheBackend: Send + Sync + 'static {
    /// Equality lookup by key.
    async fn fetch(&self, key: &str) -> Result<Option<CacheEntry>>;

    /// Inserts the row, or replaces `value`/`expires_at` and bumps `updated_at`
    /// if the key already exists.
    async fn upsert(&self, key: &str, value: &Value, expires_at: DateTime<Utc>) -> Result<()>;

    /// Deletes a single key. Returns whether a row was removed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Deletes `key` only if its row has `expires_at <= now`. A row refreshed
    /// by a concurrent upsert is left in place. Returns whether a row was removed.
    async fn delete_if_expired(&self, key: &str, now: DateTime<Utc>) -> Result<bool>;

    /// Deletes every key in `keys`. Returns the number of rows removed.
    async fn delete_many(&self, keys: &[String]) -> Result<u64>;

    /// Deletes rows with `expires_at <= now`. Returns the number removed.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64>;

    /// Returns every key starting with `prefix`.
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;

    /// Counts rows matching `filter` at `now`.
    async fn count(&self, filter: &EntryFilter, now: DateTime<Utc>) -> Result<u64>;

    /// Lists rows matching `filter`, newest `created_at` first.
    async fn list(
        &self,
        filter: &EntryFilter,
        now: DateTime<Utc>,
        limit: Option<usize>,
    ) -> Result<Vec<CacheEntry>>;

    /// Cheap connectivity check.
    async fn ping(&self) -> Result<()>;
}
