//! Configuration Module
//!
//! Handles loading and managing service configuration from environment variables.

use std::env;
use std::str::FromStr;

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL; `None` selects the in-process backend
    pub database_url: Option<String>,
    /// Maximum pooled database connections
    pub db_max_connections: u32,
    /// Seconds to wait for a pooled connection
    pub db_acquire_timeout: u64,
    /// Create the cache table on startup
    pub run_migrations: bool,
    /// Default TTL in seconds for entries without explicit TTL
    pub default_ttl: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Periodic cleanup interval in seconds (0 disables the task)
    pub cleanup_interval: u64,
    /// Maximum rows returned by admin listings
    pub status_list_limit: usize,
    /// Key prefix summarised by the admin status view
    pub status_namespace: String,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `DATABASE_URL` - PostgreSQL URL (default: unset, in-process backend)
    /// - `DB_MAX_CONNECTIONS` - Pool size (default: 5)
    /// - `DB_ACQUIRE_TIMEOUT` - Pool acquire timeout in seconds (default: 10)
    /// - `RUN_MIGRATIONS` - Create the cache table on startup (default: true)
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 3600)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Cleanup frequency in seconds (default: 3600)
    /// - `STATUS_LIST_LIMIT` - Admin listing bound (default: 20)
    /// - `STATUS_NAMESPACE` - Admin status namespace (default: "crypto:")
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            database_url: env::var("DATABASE_URL").ok().filter(|v| !v.trim().is_empty()),
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", defaults.db_max_connections),
            db_acquire_timeout: parse_var("DB_ACQUIRE_TIMEOUT", defaults.db_acquire_timeout),
            run_migrations: parse_var("RUN_MIGRATIONS", defaults.run_migrations),
            default_ttl: parse_var("DEFAULT_TTL", defaults.default_ttl),
            server_port: parse_var("SERVER_PORT", defaults.server_port),
            cleanup_interval: parse_var("CLEANUP_INTERVAL", defaults.cleanup_interval),
            status_list_limit: parse_var("STATUS_LIST_LIMIT", defaults.status_list_limit),
            status_namespace: env::var("STATUS_NAMESPACE").unwrap_or(defaults.status_namespace),
        }
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            db_max_connections: 5,
            db_acquire_timeout: 10,
            run_migrations: true,
            default_ttl: crate::cache::DEFAULT_TTL_SECS,
            server_port: 3000,
            cleanup_interval: 3600,
            status_list_limit: 20,
            status_namespace: "crypto:".to_string(),
        }
    }
}
