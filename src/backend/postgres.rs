//! PostgreSQL backend
//!
//! Uses sqlx with PostgreSQL for the `cache` table.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use tracing::info;

use super::{CacheBackend, EntryFilter};
use crate::cache::CacheEntry;
use crate::error::Result;

const SELECT_COLUMNS: &str = "key, value, expires_at, created_at, updated_at";

// Shared WHERE clause for count/list.
// $1 = LIKE pattern or NULL, $2 = expiry state, $3 = now
const FILTER_CLAUSE: &str = r"
    WHERE ($1::text IS NULL OR key LIKE $1 ESCAPE '\')
      AND (
            $2::text = 'all'
         OR ($2::text = 'valid' AND expires_at > $3)
         OR ($2::text = 'expired' AND expires_at <= $3)
      )";

/// Escapes LIKE metacharacters so `prefix` is matched literally.
pub fn escape_like(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len());
    for c in prefix.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn prefix_pattern(prefix: &str) -> String {
    format!("{}%", escape_like(prefix))
}

/// Cache table backed by a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PostgresBackend {
    pool: PgPool,
}

impl PostgresBackend {
    /// Connect to the database
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self> {
        info!("Connecting to database...");
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(database_url)
            .await?;
        info!("Database connection established");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the cache table and its expiry index if missing
    pub async fn migrate(&self) -> Result<()> {
        info!("Running cache table migrations...");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cache (
                key TEXT PRIMARY KEY,
                value JSONB NOT NULL,
                expires_at TIMESTAMPTZ NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_cache_expires_at ON cache(expires_at)")
            .execute(&self.pool)
            .await?;

        info!("Cache table migrations complete");
        Ok(())
    }
}

#[async_trait]
impl CacheBackend for PostgresBackend {
    async fn fetch(&self, key: &str) -> Result<Option<CacheEntry>> {
        let row = sqlx::query_as::<_, CacheEntry>(&format!(
            "SELECT {} FROM cache WHERE key = $1",
            SELECT_COLUMNS
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn upsert(&self, key: &str, value: &Value, expires_at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO cache (key, value, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (key) DO UPDATE SET
                value = EXCLUDED.value,
                expires_at = EXCLUDED.expires_at,
                updated_at = NOW()
            "#,
        )
        .bind(key)
        .bind(Json(value))
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM cache WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_if_expired(&self, key: &str, now: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query("DELETE FROM cache WHERE key = $1 AND expires_at <= $2")
            .bind(key)
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_many(&self, keys: &[String]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query("DELETE FROM cache WHERE key = ANY($1)")
            .bind(keys)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM cache WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let keys = sqlx::query_scalar::<_, String>(
            r"SELECT key FROM cache WHERE key LIKE $1 ESCAPE '\'",
        )
        .bind(prefix_pattern(prefix))
        .fetch_all(&self.pool)
        .await?;
        Ok(keys)
    }

    async fn count(&self, filter: &EntryFilter, now: DateTime<Utc>) -> Result<u64> {
        let count = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM cache {}",
            FILTER_CLAUSE
        ))
        .bind(filter.prefix.as_deref().map(prefix_pattern))
        .bind(filter.state.as_str())
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.max(0) as u64)
    }

    async fn list(
        &self,
        filter: &EntryFilter,
        now: DateTime<Utc>,
        limit: Option<usize>,
    ) -> Result<Vec<CacheEntry>> {
        let rows = sqlx::query_as::<_, CacheEntry>(&format!(
            "SELECT {} FROM cache {} ORDER BY created_at DESC, key ASC LIMIT $4",
            SELECT_COLUMNS, FILTER_CLAUSE
        ))
        .bind(filter.prefix.as_deref().map(prefix_pattern))
        .bind(filter.state.as_str())
        .bind(now)
        .bind(limit.map(|l| l as i64))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
