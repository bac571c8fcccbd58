//! Request DTOs for the cache service API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use serde::Deserialize;
use serde_json::Value;

use crate::backend::ExpiryState;
use crate::cache::MAX_KEY_LENGTH;

/// Request body for the SET operation (PUT /cache)
///
/// # Fields
/// - `key`: The cache key to store the value under
/// - `value`: Any JSON payload
/// - `ttl`: Optional TTL in seconds (uses default if not specified)
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The cache key
    pub key: String,
    /// The payload to store
    pub value: Value,
    /// Optional TTL in seconds
    #[serde(default)]
    pub ttl: Option<u64>,
}

impl SetRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.key.is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        if self.key.len() > MAX_KEY_LENGTH {
            return Some(format!(
                "Key exceeds maximum length of {} bytes",
                MAX_KEY_LENGTH
            ));
        }
        if self.ttl == Some(0) {
            return Some("TTL must be at least 1 second".to_string());
        }
        None
    }
}

/// Query string for DELETE /cache?pattern=crypto:BTC:*
#[derive(Debug, Clone, Deserialize)]
pub struct PatternQuery {
    pub pattern: String,
}

/// Query string for GET /admin/cache-status
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusQuery {
    /// Namespace prefix to summarise (defaults to the configured namespace)
    pub prefix: Option<String>,
    /// Listing bound (capped at the configured limit)
    pub limit: Option<usize>,
}

/// Query string for GET /admin/cache/entries
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntriesQuery {
    #[serde(default)]
    pub state: ExpiryState,
    pub prefix: Option<String>,
    pub limit: Option<usize>,
}
