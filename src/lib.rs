//! Coin Cache - persistent TTL cache for crypto market data and AI analysis
//!
//! Stores JSON payloads in a key/value/expiry table with lazy eviction on read
//! and a periodic sweep of expired rows.

pub mod api;
pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::CacheStore;
pub use config::Config;
pub use tasks::spawn_cleanup_task;
