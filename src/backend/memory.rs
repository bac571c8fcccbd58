//! In-process backend
//!
//! A `HashMap` table behind a tokio `RwLock`. Each call is atomic on its own;
//! like the SQL backend, nothing spans calls.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::RwLock;

use super::{CacheBackend, EntryFilter};
use crate::cache::CacheEntry;
use crate::error::Result;

#[derive(Debug, Default)]
pub struct MemoryBackend {
    rows: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of physical rows, expired ones included.
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    /// Direct existence check that bypasses expiry handling.
    pub async fn contains(&self, key: &str) -> bool {
        self.rows.read().await.contains_key(key)
    }

    /// Raw row access that bypasses expiry handling.
    pub async fn row(&self, key: &str) -> Option<CacheEntry> {
        self.rows.read().await.get(key).cloned()
    }

    /// Overwrites the expiry of an existing row. Used to simulate elapsed time.
    pub async fn set_expires_at(&self, key: &str, expires_at: DateTime<Utc>) -> bool {
        match self.rows.write().await.get_mut(key) {
            Some(row) => {
                row.expires_at = expires_at;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn fetch(&self, key: &str) -> Result<Option<CacheEntry>> {
        Ok(self.rows.read().await.get(key).cloned())
    }

    async fn upsert(&self, key: &str, value: &Value, expires_at: DateTime<Utc>) -> Result<()> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(key) {
            Some(row) => {
                row.value = value.clone();
                row.expires_at = expires_at;
                row.updated_at = Utc::now();
            }
            None => {
                rows.insert(
                    key.to_string(),
                    CacheEntry::new(key, value.clone(), expires_at),
                );
            }
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.rows.write().await.remove(key).is_some())
    }

    async fn delete_if_expired(&self, key: &str, now: DateTime<Utc>) -> Result<bool> {
        let mut rows = self.rows.write().await;
        match rows.get(key) {
            Some(row) if row.is_expired_at(now) => {
                rows.remove(key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_many(&self, keys: &[String]) -> Result<u64> {
        let mut rows = self.rows.write().await;
        let removed = keys.iter().filter(|key| rows.remove(*key).is_some()).count();
        Ok(removed as u64)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|_, row| !row.is_expired_at(now));
        Ok((before - rows.len()) as u64)
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .rows
            .read()
            .await
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn count(&self, filter: &EntryFilter, now: DateTime<Utc>) -> Result<u64> {
        let rows = self.rows.read().await;
        Ok(rows.values().filter(|row| filter.matches(row, now)).count() as u64)
    }

    async fn list(
        &self,
        filter: &EntryFilter,
        now: DateTime<Utc>,
        limit: Option<usize>,
    ) -> Result<Vec<CacheEntry>> {
        let rows = self.rows.read().await;
        let mut matching: Vec<CacheEntry> = rows
            .values()
            .filter(|row| filter.matches(row, now))
            .cloned()
            .collect();

        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.key.cmp(&b.key))
        });
        if let Some(limit) = limit {
            matching.truncate(limit);
        }
        Ok(matching)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
