//! End-to-end scenarios for the cache store over the in-process table.

use std::sync::Arc;

use chrono::{Duration, Utc};
use coin_cache::backend::{CacheBackend, MemoryBackend};
use coin_cache::cache::domain::{CRYPTO_ANALYSIS_TTL, FINANCIAL_DATA_TTL, NEWS_TTL};
use coin_cache::cache::{CacheStore, FetchSource};
use serde::{Deserialize, Serialize};
use serde_json::json;

fn create_store() -> (CacheStore, Arc<MemoryBackend>) {
    let backend = Arc::new(MemoryBackend::new());
    (CacheStore::new(backend.clone(), 3600), backend)
}

#[tokio::test]
async fn test_crypto_analysis_expires_and_is_evicted() {
    let (store, backend) = create_store();

    store
        .set("crypto:BTC:full", json!({"price": 42000}), Some(CRYPTO_ANALYSIS_TTL))
        .await
        .unwrap();
    assert_eq!(
        store.get("crypto:BTC:full").await.into_value(),
        Some(json!({"price": 42000}))
    );

    backend
        .set_expires_at("crypto:BTC:full", Utc::now() - Duration::seconds(1))
        .await;

    assert!(store.get("crypto:BTC:full").await.is_miss());
    assert!(backend.fetch("crypto:BTC:full").await.unwrap().is_none());
}

#[tokio::test]
async fn test_stock_pattern_delete_removes_all_variants() {
    let (store, _) = create_store();

    store
        .set("stock:NVDA:news", json!([{"title": "guidance"}]), Some(NEWS_TTL))
        .await
        .unwrap();
    store
        .set("stock:NVDA:financial", json!({"revenue": 1}), Some(FINANCIAL_DATA_TTL))
        .await
        .unwrap();

    assert_eq!(store.delete_pattern("stock:NVDA:*").await, 2);
    assert!(store.get("stock:NVDA:news").await.is_miss());
    assert!(store.get("stock:NVDA:financial").await.is_miss());
}

#[tokio::test]
async fn test_upsert_keeps_single_row_with_latest_ttl() {
    let (store, backend) = create_store();

    store.set("crypto:ETH:full", json!(1), Some(60)).await.unwrap();
    store.set("crypto:ETH:full", json!(2), Some(7200)).await.unwrap();

    assert_eq!(backend.len().await, 1);
    let row = backend.row("crypto:ETH:full").await.unwrap();
    assert_eq!(row.value, json!(2));
    assert!(row.ttl_remaining_at(Utc::now()) > 7000);
}

#[tokio::test]
async fn test_cleanup_leaves_valid_rows_untouched() {
    let (store, backend) = create_store();
    for (i, key) in ["a", "b", "c", "d"].iter().enumerate() {
        store.set(key, json!(i), None).await.unwrap();
    }
    backend.set_expires_at("a", Utc::now() - Duration::seconds(10)).await;
    backend.set_expires_at("c", Utc::now()).await;

    assert_eq!(store.cleanup().await, 2);
    assert_eq!(store.get("b").await.into_value(), Some(json!(1)));
    assert_eq!(store.get("d").await.into_value(), Some(json!(3)));
    assert_eq!(backend.len().await, 2);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Prediction {
    symbol: String,
    target: f64,
}

#[tokio::test]
async fn test_fetch_or_compute_serves_second_call_from_cache() {
    let (store, _) = create_store();
    let compute = || async {
        Ok::<_, String>(Prediction {
            symbol: "SOL".to_string(),
            target: 180.0,
        })
    };

    let first = store
        .fetch_or_compute("crypto:SOL:prediction", 7200, compute)
        .await
        .unwrap();
    assert_eq!(first.source, FetchSource::Fresh);
    assert!(first.cache_written);

    let second = store
        .fetch_or_compute("crypto:SOL:prediction", 7200, || async {
            Err::<Prediction, _>("upstream should not be called".to_string())
        })
        .await
        .unwrap();
    assert_eq!(second.source, FetchSource::Cache);
    assert_eq!(second.value, first.value);
}

#[tokio::test]
async fn test_recommendations_roundtrip() {
    let (store, _) = create_store();

    store
        .set_crypto_recommendations(json!(["BTC", "ETH"]))
        .await
        .unwrap();

    let hit = store.get_crypto_recommendations().await.into_cached().unwrap();
    assert_eq!(hit.value, json!(["BTC", "ETH"]));
    assert!(hit.cached_at <= Utc::now());
}
