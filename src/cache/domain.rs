//! Domain Wrappers
//!
//! Key naming and fixed TTLs for stock and crypto payloads. Keys follow
//! `{domain}:{identifier}:{variant}`; other components build keys through
//! these functions so invalidation by identifier keeps working.

use serde_json::Value;
use tracing::debug;

use crate::cache::{CacheLookup, CacheStore};
use crate::error::Result;

// == TTLs (seconds) ==
pub const FINANCIAL_DATA_TTL: u64 = 3600;
pub const AI_ANALYSIS_TTL: u64 = 1800;
pub const NEWS_TTL: u64 = 900;
pub const FULL_ANALYSIS_TTL: u64 = 21600;
pub const CRYPTO_ANALYSIS_TTL: u64 = 21600;
pub const CRYPTO_PREDICTION_TTL: u64 = 7200;
pub const CRYPTO_RECOMMENDATIONS_TTL: u64 = 3600;

/// Key of the daily recommendation set.
pub const CRYPTO_RECOMMENDATIONS_KEY: &str = "crypto:recommendations:today";

// == Key Builders ==
pub fn stock_financial_key(id: &str) -> String {
    format!("stock:{}:financial", id)
}

pub fn stock_analysis_key(id: &str) -> String {
    format!("stock:{}:analysis", id)
}

pub fn stock_news_key(id: &str) -> String {
    format!("stock:{}:news", id)
}

pub fn stock_full_key(id: &str) -> String {
    format!("stock:{}:full", id)
}

pub fn stock_pattern(id: &str) -> String {
    format!("stock:{}:*", id)
}

pub fn crypto_analysis_key(symbol: &str) -> String {
    format!("crypto:{}:full", symbol)
}

pub fn crypto_prediction_key(symbol: &str) -> String {
    format!("crypto:{}:prediction", symbol)
}

pub fn crypto_pattern(symbol: &str) -> String {
    format!("crypto:{}:*", symbol)
}

/// Extracts the `{identifier}` segment of a key, if it has one.
pub fn key_identifier(key: &str) -> Option<&str> {
    key.split(':').nth(1).filter(|segment| !segment.is_empty())
}

impl CacheStore {
    // == Stocks ==
    pub async fn get_financial_data(&self, id: &str) -> CacheLookup {
        self.get(&stock_financial_key(id)).await
    }

    pub async fn set_financial_data(&self, id: &str, data: Value) -> Result<()> {
        self.set(&stock_financial_key(id), data, Some(FINANCIAL_DATA_TTL)).await
    }

    pub async fn get_analysis(&self, id: &str) -> CacheLookup {
        self.get(&stock_analysis_key(id)).await
    }

    pub async fn set_analysis(&self, id: &str, data: Value) -> Result<()> {
        self.set(&stock_analysis_key(id), data, Some(AI_ANALYSIS_TTL)).await
    }

    pub async fn get_news(&self, id: &str) -> CacheLookup {
        self.get(&stock_news_key(id)).await
    }

    pub async fn set_news(&self, id: &str, data: Value) -> Result<()> {
        self.set(&stock_news_key(id), data, Some(NEWS_TTL)).await
    }

    pub async fn get_full_analysis(&self, id: &str) -> CacheLookup {
        self.get(&stock_full_key(id)).await
    }

    pub async fn set_full_analysis(&self, id: &str, data: Value) -> Result<()> {
        self.set(&stock_full_key(id), data, Some(FULL_ANALYSIS_TTL)).await
    }

    /// Drops every cached payload for one stock.
    pub async fn invalidate_stock(&self, id: &str) -> usize {
        self.delete_pattern(&stock_pattern(id)).await
    }

    // == Crypto ==
    pub async fn get_crypto_analysis(&self, symbol: &str) -> CacheLookup {
        let key = crypto_analysis_key(symbol);
        let lookup = self.get(&key).await;
        if lookup.is_hit() {
            debug!("Cache hit: {}", key);
        } else {
            debug!("Cache miss: {}", key);
        }
        lookup
    }

    pub async fn set_crypto_analysis(&self, symbol: &str, data: Value) -> Result<()> {
        self.set(&crypto_analysis_key(symbol), data, Some(CRYPTO_ANALYSIS_TTL)).await
    }

    pub async fn get_crypto_prediction(&self, symbol: &str) -> CacheLookup {
        self.get(&crypto_prediction_key(symbol)).await
    }

    pub async fn set_crypto_prediction(&self, symbol: &str, data: Value) -> Result<()> {
        self.set(&crypto_prediction_key(symbol), data, Some(CRYPTO_PREDICTION_TTL)).await
    }

    pub async fn get_crypto_recommendations(&self) -> CacheLookup {
        self.get(CRYPTO_RECOMMENDATIONS_KEY).await
    }

    pub async fn set_crypto_recommendations(&self, data: Value) -> Result<()> {
        self.set(CRYPTO_RECOMMENDATIONS_KEY, data, Some(CRYPTO_RECOMMENDATIONS_TTL)).await
    }

    /// Drops every cached payload for one coin.
    pub async fn invalidate_crypto(&self, symbol: &str) -> usize {
        self.delete_pattern(&crypto_pattern(symbol)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use chrono::Utc;
    use serde_json::json;
    use std::sync::Arc;

    fn create_store() -> (CacheStore, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        (CacheStore::new(backend.clone(), 3600), backend)
    }

    async fn ttl_of(backend: &MemoryBackend, key: &str) -> i64 {
        let row = backend.row(key).await.expect("row should exist");
        (row.expires_at - Utc::now()).num_seconds()
    }

    fn assert_ttl_near(actual: i64, expected: u64) {
        let expected = expected as i64;
        assert!(
            (expected - 2..=expected).contains(&actual),
            "ttl {} not near {}",
            actual,
            expected
        );
    }

    #[test]
    fn test_key_builders() {
        assert_eq!(stock_financial_key("NVDA"), "stock:NVDA:financial");
        assert_eq!(stock_analysis_key("NVDA"), "stock:NVDA:analysis");
        assert_eq!(stock_news_key("NVDA"), "stock:NVDA:news");
        assert_eq!(stock_full_key("NVDA"), "stock:NVDA:full");
        assert_eq!(stock_pattern("NVDA"), "stock:NVDA:*");
        assert_eq!(crypto_analysis_key("BTC"), "crypto:BTC:full");
        assert_eq!(crypto_prediction_key("BTC"), "crypto:BTC:prediction");
        assert_eq!(crypto_pattern("BTC"), "crypto:BTC:*");
    }

    #[test]
    fn test_key_identifier() {
        assert_eq!(key_identifier("crypto:BTC:full"), Some("BTC"));
        assert_eq!(key_identifier("crypto:recommendations:today"), Some("recommendations"));
        assert_eq!(key_identifier("plain"), None);
        assert_eq!(key_identifier("odd::key"), None);
    }

    #[tokio::test]
    async fn test_stock_wrappers_use_fixed_ttls() {
        let (store, backend) = create_store();

        store.set_financial_data("NVDA", json!({"pe": 60})).await.unwrap();
        store.set_analysis("NVDA", json!({"decision": "BUY"})).await.unwrap();
        store.set_news("NVDA", json!([])).await.unwrap();
        store.set_full_analysis("NVDA", json!({})).await.unwrap();

        assert_ttl_near(ttl_of(&backend, "stock:NVDA:financial").await, FINANCIAL_DATA_TTL);
        assert_ttl_near(ttl_of(&backend, "stock:NVDA:analysis").await, AI_ANALYSIS_TTL);
        assert_ttl_near(ttl_of(&backend, "stock:NVDA:news").await, NEWS_TTL);
        assert_ttl_near(ttl_of(&backend, "stock:NVDA:full").await, FULL_ANALYSIS_TTL);

        assert_eq!(
            store.get_analysis("NVDA").await.into_value(),
            Some(json!({"decision": "BUY"}))
        );
        assert!(store.get_news("NVDA").await.is_hit());
        assert!(store.get_financial_data("NVDA").await.is_hit());
        assert!(store.get_full_analysis("NVDA").await.is_hit());
    }

    #[tokio::test]
    async fn test_crypto_wrappers_use_fixed_ttls() {
        let (store, backend) = create_store();

        store.set_crypto_analysis("BTC", json!({"price": 42000})).await.unwrap();
        store.set_crypto_prediction("BTC", json!({"day1": 1})).await.unwrap();
        store.set_crypto_recommendations(json!({"hotPick": "SOL"})).await.unwrap();

        assert_ttl_near(ttl_of(&backend, "crypto:BTC:full").await, CRYPTO_ANALYSIS_TTL);
        assert_ttl_near(ttl_of(&backend, "crypto:BTC:prediction").await, CRYPTO_PREDICTION_TTL);
        assert_ttl_near(
            ttl_of(&backend, CRYPTO_RECOMMENDATIONS_KEY).await,
            CRYPTO_RECOMMENDATIONS_TTL,
        );

        assert_eq!(
            store.get_crypto_analysis("BTC").await.into_value(),
            Some(json!({"price": 42000}))
        );
        assert!(store.get_crypto_prediction("BTC").await.is_hit());
        assert!(store.get_crypto_recommendations().await.is_hit());
    }

    #[tokio::test]
    async fn test_invalidate_stock() {
        let (store, backend) = create_store();
        store.set_news("NVDA", json!([])).await.unwrap();
        store.set_financial_data("NVDA", json!({})).await.unwrap();
        store.set_news("AAPL", json!([])).await.unwrap();

        assert_eq!(store.invalidate_stock("NVDA").await, 2);

        assert!(store.get_news("NVDA").await.is_miss());
        assert!(store.get_financial_data("NVDA").await.is_miss());
        assert!(backend.contains("stock:AAPL:news").await);
    }

    #[tokio::test]
    async fn test_invalidate_crypto_leaves_other_symbols() {
        let (store, backend) = create_store();
        store.set_crypto_analysis("BTC", json!({})).await.unwrap();
        store.set_crypto_prediction("BTC", json!({})).await.unwrap();
        store.set_crypto_analysis("ETH", json!({})).await.unwrap();

        assert_eq!(store.invalidate_crypto("BTC").await, 2);
        assert!(backend.contains("crypto:ETH:full").await);
    }
}
