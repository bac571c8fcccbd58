//! Coin Cache - persistent TTL cache for crypto market data and AI analysis
//!
//! HTTP front for the cache store, backed by PostgreSQL when `DATABASE_URL`
//! is set and by an in-process table otherwise.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use coin_cache::api::create_router;
use coin_cache::backend::{CacheBackend, MemoryBackend, PostgresBackend};
use coin_cache::{spawn_cleanup_task, AppState, Config};

/// Main entry point for the cache service.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Connect the backend (and create the table if enabled)
/// 4. Start background expired-row cleanup task
/// 5. Create Axum router with all endpoints
/// 6. Start HTTP server on configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coin_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Coin Cache service");

    let config = Config::from_env();
    info!(
        "Configuration loaded: default_ttl={}s, port={}, cleanup_interval={}s, namespace={}",
        config.default_ttl, config.server_port, config.cleanup_interval, config.status_namespace
    );

    let backend = connect_backend(&config).await?;
    let state = AppState::from_config(&config, backend);
    info!("Cache store initialized");

    let cleanup_handle = if config.cleanup_interval > 0 {
        let handle = spawn_cleanup_task(state.cache.clone(), config.cleanup_interval);
        info!("Background cleanup task started");
        Some(handle)
    } else {
        info!("Background cleanup disabled");
        None
    };

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cleanup_handle))
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn connect_backend(config: &Config) -> anyhow::Result<Arc<dyn CacheBackend>> {
    let Some(url) = config.database_url.as_deref() else {
        warn!("DATABASE_URL not set, using in-process cache table (data is not persisted)");
        return Ok(Arc::new(MemoryBackend::new()));
    };

    let backend = PostgresBackend::connect(
        url,
        config.db_max_connections,
        Duration::from_secs(config.db_acquire_timeout),
    )
    .await
    .context("failed to connect to database")?;

    if config.run_migrations {
        backend
            .migrate()
            .await
            .context("failed to create cache table")?;
    }

    Ok(Arc::new(backend))
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the cleanup task and allows graceful shutdown.
async fn shutdown_signal(cleanup_handle: Option<JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    if let Some(handle) = cleanup_handle {
        handle.abort();
        warn!("Cleanup task aborted");
    }
}
