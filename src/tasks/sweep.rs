//! Expired Entry Sweep Task
//!
//! Background task that periodically removes expired cache entries.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::fetch::SharedStore;

/// Shortest allowed pause between sweeps.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Spawns a background task that sweeps expired entries every `interval`.
///
/// The task runs until aborted, sleeping between sweeps and taking the
/// store's write lock only for the sweep itself. Intervals shorter than
/// [`MIN_SWEEP_INTERVAL`] are raised to it.
///
/// # Returns
/// A JoinHandle for the spawned task; abort it when the session ends so
/// no sweep runs against a torn-down store.
///
/// # Example
/// ```ignore
/// let store = Arc::new(RwLock::new(CacheStore::new(100)));
/// let sweep_handle = spawn_sweep_task(store.clone(), Duration::from_secs(300));
/// // Later, during shutdown:
/// sweep_handle.abort();
/// ```
pub fn spawn_sweep_task(store: SharedStore, interval: Duration) -> JoinHandle<()> {
    let interval = interval.max(MIN_SWEEP_INTERVAL);
    tokio::spawn(async move {
        info!(?interval, "Starting cache sweep task");

        loop {
            tokio::time::sleep(interval).await;

            let (removed, remaining) = {
                let mut guard = store.write().await;
                let removed = guard.sweep();
                (removed, guard.len())
            };

            if removed > 0 {
                info!(removed, remaining, "Cache sweep removed expired entries");
            } else {
                debug!(remaining, "Cache sweep found no expired entries");
            }
        }
    })
}
