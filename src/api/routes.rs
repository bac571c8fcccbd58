//! API Routes
//!
//! Configures the Axum router with the cache and admin endpoints.

use axum::{
    routing::{delete, get, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    cache_status_handler, cleanup_handler, delete_handler, delete_pattern_handler,
    diagnostics_handler, entries_handler, get_handler, health_handler, invalidate_crypto_handler,
    invalidate_stock_handler, set_handler, stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `PUT /cache` - Store a JSON payload under a key
/// - `DELETE /cache?pattern=...` - Delete by exact key or trailing-`*` prefix
/// - `GET /cache/:key` - Read a live entry
/// - `DELETE /cache/:key` - Delete a key
/// - `DELETE /cache/crypto/:symbol` - Invalidate every entry for a crypto symbol
/// - `DELETE /cache/stock/:id` - Invalidate every entry for a stock identifier
/// - `GET /admin/cache-status` - Counts and per-identifier summary
/// - `DELETE /admin/cache-status` - Remove expired rows
/// - `GET /admin/cache/entries` - List rows filtered by expiry state and prefix
/// - `GET /admin/db-test` - Write/read/delete probe against the backend
/// - `GET /stats` - Store counters
/// - `GET /health` - Health check endpoint
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/cache", put(set_handler).delete(delete_pattern_handler))
        .route("/cache/:key", get(get_handler).delete(delete_handler))
        .route("/cache/crypto/:symbol", delete(invalidate_crypto_handler))
        .route("/cache/stock/:id", delete(invalidate_stock_handler))
        .route(
            "/admin/cache-status",
            get(cache_status_handler).delete(cleanup_handler),
        )
        .route("/admin/cache/entries", get(entries_handler))
        .route("/admin/db-test", get(diagnostics_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
