//! Key Pattern Module
//!
//! Restricted glob support for bulk invalidation: a single trailing `*`
//! becomes a "starts with" match, no wildcard means an exact key.

use std::fmt;

use crate::error::{CacheError, Result};

/// Wildcard character accepted at the end of a pattern.
pub const WILDCARD: char = '*';

/// A parsed invalidation pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyPattern {
    /// Matches every key starting with the prefix (`crypto:BTC:*`)
    Prefix(String),
    /// Matches a single key
    Exact(String),
}

impl KeyPattern {
    /// Parses a pattern such as `stock:NVDA:*`.
    ///
    /// Rejects empty patterns and wildcards anywhere but the final position.
    pub fn parse(pattern: &str) -> Result<Self> {
        if pattern.is_empty() {
            return Err(CacheError::InvalidRequest("Pattern cannot be empty".to_string()));
        }

        let (body, trailing) = match pattern.strip_suffix(WILDCARD) {
            Some(body) => (body, true),
            None => (pattern, false),
        };

        if body.contains(WILDCARD) {
            return Err(CacheError::InvalidRequest(format!(
                "Only a single trailing '{}' is supported: {}",
                WILDCARD, pattern
            )));
        }

        if trailing {
            Ok(KeyPattern::Prefix(body.to_string()))
        } else {
            Ok(KeyPattern::Exact(body.to_string()))
        }
    }

    /// Returns true if `key` is covered by this pattern.
    pub fn matches(&self, key: &str) -> bool {
        match self {
            KeyPattern::Prefix(prefix) => key.starts_with(prefix.as_str()),
            KeyPattern::Exact(exact) => key == exact,
        }
    }
}

impl fmt::Display for KeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPattern::Prefix(prefix) => write!(f, "{}{}", prefix, WILDCARD),
            KeyPattern::Exact(exact) => f.write_str(exact),
        }
    }
}
