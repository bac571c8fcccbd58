//! Cache Inspection Module
//!
//! Read-only views over the cache table for the admin surface: row counts,
//! bounded listings and a per-identifier aggregation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::backend::{EntryFilter, ExpiryState};
use crate::cache::domain::key_identifier;
use crate::cache::{CacheEntry, CacheStore, StatsSnapshot};
use crate::error::Result;

/// Row counts at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheSummary {
    pub total: u64,
    /// `expires_at > now`
    pub valid: u64,
    /// `expires_at <= now`
    pub expired: u64,
    /// Valid rows under the namespace prefix
    pub namespace: u64,
}

/// One listed row, without its payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryInfo {
    pub key: String,
    pub identifier: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Seconds until expiry, 0 once expired
    pub remaining_secs: u64,
    pub expired: bool,
}

impl EntryInfo {
    pub fn from_entry(entry: &CacheEntry, now: DateTime<Utc>) -> Self {
        Self {
            key: entry.key.clone(),
            identifier: key_identifier(&entry.key).map(str::to_string),
            expires_at: entry.expires_at,
            created_at: entry.created_at,
            updated_at: entry.updated_at,
            remaining_secs: entry.ttl_remaining_at(now),
            expired: entry.is_expired_at(now),
        }
    }
}

/// Rows grouped by the `{identifier}` key segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdentifierSummary {
    pub identifier: String,
    /// Number of cached rows for the identifier
    pub entries: usize,
    pub valid: usize,
    pub expired: usize,
    /// Latest write across the group
    pub last_updated: DateTime<Utc>,
    /// Furthest expiry across the group
    pub latest_expiry: DateTime<Utc>,
    /// `valid` if any row is still valid, otherwise `expired`
    pub state: ExpiryStateLabel,
    pub keys: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpiryStateLabel {
    Valid,
    Expired,
}

/// Full admin status view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStatus {
    pub generated_at: DateTime<Utc>,
    pub namespace_prefix: String,
    pub summary: CacheSummary,
    /// Newest valid rows, bounded
    pub valid_entries: Vec<EntryInfo>,
    /// Newest valid rows under the namespace prefix, bounded
    pub namespace_entries: Vec<EntryInfo>,
    pub identifiers: Vec<IdentifierSummary>,
    pub stats: StatsSnapshot,
}

/// Groups rows by identifier. Keys without an identifier segment form their
/// own group under the whole key. Output is sorted by identifier.
pub fn summarize_identifiers(entries: &[CacheEntry], now: DateTime<Utc>) -> Vec<IdentifierSummary> {
    let mut groups: BTreeMap<String, IdentifierSummary> = BTreeMap::new();

    for entry in entries {
        let identifier = key_identifier(&entry.key).unwrap_or(&entry.key).to_string();
        let expired = entry.is_expired_at(now);

        let group = groups
            .entry(identifier.clone())
            .or_insert_with(|| IdentifierSummary {
                identifier,
                entries: 0,
                valid: 0,
                expired: 0,
                last_updated: entry.updated_at,
                latest_expiry: entry.expires_at,
                state: ExpiryStateLabel::Expired,
                keys: Vec::new(),
            });

        group.entries += 1;
        if expired {
            group.expired += 1;
        } else {
            group.valid += 1;
            group.state = ExpiryStateLabel::Valid;
        }
        group.last_updated = group.last_updated.max(entry.updated_at);
        group.latest_expiry = group.latest_expiry.max(entry.expires_at);
        group.keys.push(entry.key.clone());
    }

    groups
        .into_values()
        .map(|mut group| {
            group.keys.sort();
            group
        })
        .collect()
}

impl CacheStore {
    /// Counts total, valid, expired and namespace rows.
    pub async fn summary(
        &self,
        namespace_prefix: &str,
        now: DateTime<Utc>,
    ) -> Result<CacheSummary> {
        let backend = self.backend();
        Ok(CacheSummary {
            total: backend.count(&EntryFilter::all(), now).await?,
            valid: backend.count(&EntryFilter::valid(), now).await?,
            expired: backend.count(&EntryFilter::expired(), now).await?,
            namespace: backend
                .count(&EntryFilter::valid().with_prefix(namespace_prefix), now)
                .await?,
        })
    }

    /// Bounded listing, newest first.
    pub async fn list_entries(&self, filter: &EntryFilter, limit: usize) -> Result<Vec<EntryInfo>> {
        let now = Utc::now();
        let rows = self.backend().list(filter, now, Some(limit)).await?;
        Ok(rows.iter().map(|row| EntryInfo::from_entry(row, now)).collect())
    }

    /// Builds the admin status view. Backend errors are returned, not masked.
    pub async fn status(&self, namespace_prefix: &str, limit: usize) -> Result<CacheStatus> {
        let now = Utc::now();
        let backend = self.backend();

        let summary = self.summary(namespace_prefix, now).await?;
        let valid_rows = backend.list(&EntryFilter::valid(), now, Some(limit)).await?;
        let namespace_filter = EntryFilter {
            state: ExpiryState::Valid,
            prefix: Some(namespace_prefix.to_string()),
        };
        let namespace_rows = backend.list(&namespace_filter, now, Some(limit)).await?;

        Ok(CacheStatus {
            generated_at: now,
            namespace_prefix: namespace_prefix.to_string(),
            summary,
            valid_entries: valid_rows.iter().map(|row| EntryInfo::from_entry(row, now)).collect(),
            namespace_entries: namespace_rows
                .iter()
                .map(|row| EntryInfo::from_entry(row, now))
                .collect(),
            identifiers: summarize_identifiers(&namespace_rows, now),
            stats: self.stats(),
        })
    }
}
