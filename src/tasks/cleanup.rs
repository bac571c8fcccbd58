//! Expired Row Cleanup Task
//!
//! Background task that periodically deletes expired cache rows. Reads still
//! enforce expiry on their own; this only keeps the table from growing.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheStore;

/// Spawns a background task that periodically cleans up expired cache rows.
///
/// The task runs in an infinite loop, sleeping for the specified interval
/// between cleanup runs. Backend failures are logged by the store and retried
/// on the next tick.
///
/// # Arguments
/// * `cache` - Store handle (cheap clone of the shared store)
/// * `cleanup_interval_secs` - Interval in seconds between cleanup runs
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let store = CacheStore::new(Arc::new(MemoryBackend::new()), 3600);
/// let cleanup_handle = spawn_cleanup_task(store.clone(), 3600);
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task(cache: CacheStore, cleanup_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting cache cleanup task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            // Sleep for the configured interval
            tokio::time::sleep(interval).await;

            let removed = cache.cleanup().await;

            if removed > 0 {
                info!("Cache cleanup: removed {} expired entries", removed);
            } else {
                debug!("Cache cleanup: no expired entries found");
            }
        }
    })
}
