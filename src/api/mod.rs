//! API Module
//!
//! HTTP handlers and routing for the cache service REST API.
//!
//! # Endpoints
//! - `PUT /cache`, `GET|DELETE /cache/:key` - Cache primitives
//! - `DELETE /cache?pattern=...` - Pattern invalidation
//! - `DELETE /cache/crypto/:symbol`, `DELETE /cache/stock/:id` - Identifier invalidation
//! - `/admin/...` - Status, cleanup, listing and diagnostics
//! - `GET /stats`, `GET /health`

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
