//! Response DTOs for the cache service API
//!
//! Defines the structure of outgoing HTTP response bodies.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::backend::ExpiryState;
use crate::cache::EntryInfo;

/// Response body for the GET operation (GET /cache/:key)
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    /// The requested key
    pub key: String,
    /// The stored payload
    pub value: Value,
    /// When the payload was written
    pub cached_at: DateTime<Utc>,
    pub from_cache: bool,
}

impl GetResponse {
    /// Creates a new GetResponse
    pub fn new(key: impl Into<String>, value: Value, cached_at: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            value,
            cached_at,
            from_cache: true,
        }
    }
}

/// Response body for the SET operation (PUT /cache)
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Success message
    pub message: String,
    /// The key that was set
    pub key: String,
    /// TTL applied, in seconds
    pub ttl: u64,
}

impl SetResponse {
    /// Creates a new SetResponse
    pub fn new(key: impl Into<String>, ttl: u64) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' cached for {}s", key, ttl),
            key,
            ttl,
        }
    }
}

/// Response body for the DELETE operation (DELETE /cache/:key)
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    /// Success message
    pub message: String,
    /// The key that was deleted
    pub key: String,
}

impl DeleteResponse {
    /// Creates a new DeleteResponse
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' deleted", key),
            key,
        }
    }
}

/// Response body for pattern and identifier invalidation
#[derive(Debug, Clone, Serialize)]
pub struct PatternDeleteResponse {
    pub pattern: String,
    /// Number of rows removed
    pub deleted: usize,
}

impl PatternDeleteResponse {
    pub fn new(pattern: impl Into<String>, deleted: usize) -> Self {
        Self {
            pattern: pattern.into(),
            deleted,
        }
    }
}

/// Response body for DELETE /admin/cache-status
#[derive(Debug, Clone, Serialize)]
pub struct CleanupResponse {
    pub status: String,
    pub message: String,
    pub deleted_count: usize,
}

impl CleanupResponse {
    pub fn new(deleted_count: usize) -> Self {
        Self {
            status: "ok".to_string(),
            message: format!("Removed {} expired cache entries", deleted_count),
            deleted_count,
        }
    }
}

/// Response body for GET /admin/cache/entries
#[derive(Debug, Clone, Serialize)]
pub struct EntriesResponse {
    pub state: ExpiryState,
    pub prefix: Option<String>,
    pub count: usize,
    pub entries: Vec<EntryInfo>,
}

impl EntriesResponse {
    pub fn new(state: ExpiryState, prefix: Option<String>, entries: Vec<EntryInfo>) -> Self {
        Self {
            state,
            prefix,
            count: entries.len(),
            entries,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
