//! Cache Module
//!
//! Best-effort TTL cache over a persistent key/value/expiry table, with
//! domain key helpers and admin inspection.

pub mod diagnostics;
pub mod domain;
mod entry;
mod fetch;
pub mod inspect;
mod lookup;
mod pattern;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use fetch::{FetchSource, Fetched};
pub use inspect::{CacheStatus, CacheSummary, EntryInfo, IdentifierSummary};
pub use lookup::{CacheLookup, CachedValue};
pub use pattern::KeyPattern;
pub use stats::{CacheStats, StatsSnapshot};
pub use store::CacheStore;

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// TTL applied when a write does not specify one (1 hour)
pub const DEFAULT_TTL_SECS: u64 = 3600;
