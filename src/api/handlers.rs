//! API Handlers
//!
//! HTTP request handlers for the cache primitives and the admin surface.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::error;

use crate::backend::{CacheBackend, EntryFilter};
use crate::cache::diagnostics::{run_diagnostics, DiagnosticsReport};
use crate::cache::domain::{crypto_pattern, stock_pattern};
use crate::cache::{CacheLookup, CacheStatus, CacheStore, KeyPattern, StatsSnapshot};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    CleanupResponse, DeleteResponse, EntriesQuery, EntriesResponse, ErrorResponse, GetResponse,
    HealthResponse, PatternDeleteResponse, PatternQuery, SetRequest, SetResponse, StatusQuery,
};

/// Admin endpoints answer 500 on backend failure instead of the usual mapping.
type AdminResult<T> = std::result::Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Shared cache store (clones share backend and stats)
    pub cache: CacheStore,
    /// Namespace summarised by the status view
    pub status_namespace: String,
    /// Upper bound for admin listings
    pub status_limit: usize,
}

impl AppState {
    /// Creates a new AppState around an existing store with default admin settings.
    pub fn new(cache: CacheStore) -> Self {
        let defaults = Config::default();
        Self {
            cache,
            status_namespace: defaults.status_namespace,
            status_limit: defaults.status_list_limit,
        }
    }

    /// Creates a new AppState from configuration and an already connected backend.
    pub fn from_config(config: &Config, backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            cache: CacheStore::new(backend, config.default_ttl),
            status_namespace: config.status_namespace.clone(),
            status_limit: config.status_list_limit,
        }
    }

    fn bounded_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.status_limit)
            .clamp(1, self.status_limit.max(1))
    }
}

/// Handler for PUT /cache
///
/// Stores a JSON payload with optional TTL. A rejected write is reported as
/// 503 so the caller knows the value was not cached.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let ttl = req.ttl.unwrap_or(state.cache.default_ttl());
    state.cache.set(&req.key, req.value, Some(ttl)).await?;

    Ok(Json(SetResponse::new(req.key, ttl)))
}

/// Handler for GET /cache/:key
///
/// Absent, expired and unreadable entries all answer 404.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    match state.cache.get(&key).await {
        CacheLookup::Hit(hit) => Ok(Json(GetResponse::new(key, hit.value, hit.cached_at))),
        CacheLookup::Miss => Err(CacheError::NotFound(key)),
    }
}

/// Handler for DELETE /cache/:key
///
/// Idempotent: deleting an absent key still succeeds.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<DeleteResponse> {
    state.cache.delete(&key).await;
    Json(DeleteResponse::new(key))
}

/// Handler for DELETE /cache?pattern=crypto:BTC:*
pub async fn delete_pattern_handler(
    State(state): State<AppState>,
    Query(query): Query<PatternQuery>,
) -> Result<Json<PatternDeleteResponse>> {
    let pattern = KeyPattern::parse(&query.pattern)?;
    let deleted = state.cache.delete_matching(&pattern).await;
    Ok(Json(PatternDeleteResponse::new(query.pattern, deleted)))
}

/// Handler for DELETE /cache/crypto/:symbol
pub async fn invalidate_crypto_handler(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Json<PatternDeleteResponse> {
    let deleted = state.cache.invalidate_crypto(&symbol).await;
    Json(PatternDeleteResponse::new(crypto_pattern(&symbol), deleted))
}

/// Handler for DELETE /cache/stock/:id
pub async fn invalidate_stock_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<PatternDeleteResponse> {
    let deleted = state.cache.invalidate_stock(&id).await;
    Json(PatternDeleteResponse::new(stock_pattern(&id), deleted))
}

/// Handler for GET /admin/cache-status
///
/// Backend failures answer 500 here; the admin view does not mask errors.
pub async fn cache_status_handler(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> AdminResult<CacheStatus> {
    let prefix = query.prefix.unwrap_or_else(|| state.status_namespace.clone());
    let limit = state.bounded_limit(query.limit);

    state
        .cache
        .status(&prefix, limit)
        .await
        .map(Json)
        .map_err(admin_error)
}

/// Handler for DELETE /admin/cache-status
///
/// Deletes every expired row and reports how many were removed.
pub async fn cleanup_handler(
    State(state): State<AppState>,
) -> AdminResult<CleanupResponse> {
    state
        .cache
        .try_cleanup()
        .await
        .map(|removed| Json(CleanupResponse::new(removed)))
        .map_err(admin_error)
}

/// Handler for GET /admin/cache/entries
pub async fn entries_handler(
    State(state): State<AppState>,
    Query(query): Query<EntriesQuery>,
) -> AdminResult<EntriesResponse> {
    let filter = EntryFilter {
        state: query.state,
        prefix: query.prefix.clone(),
    };
    let limit = state.bounded_limit(query.limit);

    let entries = state
        .cache
        .list_entries(&filter, limit)
        .await
        .map_err(admin_error)?;

    Ok(Json(EntriesResponse::new(query.state, query.prefix, entries)))
}

/// Handler for GET /admin/db-test
pub async fn diagnostics_handler(
    State(state): State<AppState>,
) -> (StatusCode, Json<DiagnosticsReport>) {
    let report = run_diagnostics(&state.cache, &state.status_namespace).await;
    let status = if report.success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(report))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsSnapshot> {
    Json(state.cache.stats())
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

fn admin_error(err: CacheError) -> (StatusCode, Json<ErrorResponse>) {
    error!("Admin cache operation failed: {}", err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(err.to_string())),
    )
}
