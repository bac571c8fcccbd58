//! Cache Statistics Module
//!
//! Process-local counters for hits, misses, lazy evictions and backend failures.
//! Counters are shared by every clone of a store and never persisted.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Cache Stats ==
/// Lock-free performance counters.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    expired_evictions: AtomicU64,
    read_errors: AtomicU64,
    writes: AtomicU64,
    write_failures: AtomicU64,
}

/// Point-in-time copy of [`CacheStats`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatsSnapshot {
    /// Reads served from a valid row
    pub hits: u64,
    /// Reads that found nothing usable (absent, expired or failed)
    pub misses: u64,
    /// Expired rows deleted as a side effect of a read
    pub expired_evictions: u64,
    /// Reads degraded to a miss because the backend failed
    pub read_errors: u64,
    /// Successful upserts
    pub writes: u64,
    /// Rejected upserts
    pub write_failures: u64,
    /// hits / (hits + misses)
    pub hit_rate: f64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Moves one already counted hit to the miss column. Used when a payload
    /// was read but turned out to be unusable.
    pub fn reclassify_hit_as_miss(&self) {
        let _ = self
            .hits
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |hits| hits.checked_sub(1));
        self.record_miss();
    }

    pub fn record_expired_eviction(&self) {
        self.expired_evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_read_error(&self) {
        self.read_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write_failure(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    // == Snapshot ==
    /// Copies the counters and computes the hit rate.
    ///
    /// Returns a hit rate of 0.0 if no reads have been made.
    pub fn snapshot(&self) -> StatsSnapshot {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        StatsSnapshot {
            hits,
            misses,
            expired_evictions: self.expired_evictions.load(Ordering::Relaxed),
            read_errors: self.read_errors.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            hit_rate: if total == 0 {
                0.0
            } else {
                hits as f64 / total as f64
            },
        }
    }
}
