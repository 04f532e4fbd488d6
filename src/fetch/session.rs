//! Session Cache Module
//!
//! One [`ApiCache`] per client session: it owns the store, the orchestrator
//! and the periodic sweep, and tears the sweep down when the session ends.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::info;

use crate::cache::{CacheStats, CacheStore, KeyMatcher};
use crate::config::Config;
use crate::error::Result;
use crate::fetch::{ApiRequest, CacheConfig, CachedFetcher, FetchOutcome, SharedStore, Transport};
use crate::tasks::spawn_sweep_task;

/// Session-scoped response cache.
pub struct ApiCache {
    store: SharedStore,
    fetcher: CachedFetcher,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl ApiCache {
    /// Creates the session cache and starts its sweep task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        transport: Arc<dyn Transport>,
        sweep_threshold: usize,
        sweep_interval: Duration,
    ) -> Self {
        let store: SharedStore = Arc::new(RwLock::new(CacheStore::new(sweep_threshold)));
        let fetcher = CachedFetcher::new(Arc::clone(&store), transport);
        let sweeper = spawn_sweep_task(Arc::clone(&store), sweep_interval);

        Self {
            store,
            fetcher,
            sweeper: Mutex::new(Some(sweeper)),
        }
    }

    pub fn from_config(config: &Config, transport: Arc<dyn Transport>) -> Self {
        Self::new(transport, config.sweep_threshold, config.sweep_interval())
    }

    pub fn fetcher(&self) -> &CachedFetcher {
        &self.fetcher
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub async fn cached_fetch(
        &self,
        request: ApiRequest,
        config: CacheConfig,
    ) -> Result<FetchOutcome<Value>> {
        self.fetcher.cached_fetch(request, config).await
    }

    /// Removes matching entries; `None` clears everything.
    pub async fn invalidate(&self, matcher: Option<KeyMatcher>) -> usize {
        self.store.write().await.invalidate(matcher.as_ref())
    }

    /// Removes every entry whose key contains `endpoint`.
    pub async fn invalidate_endpoint(&self, endpoint: &str) -> usize {
        self.invalidate(Some(KeyMatcher::Substring(endpoint.to_string())))
            .await
    }

    /// Clears the cache, e.g. on logout.
    pub async fn reset(&self) {
        let removed = self.store.write().await.clear();
        info!(removed, "Cache reset");
    }

    pub async fn stats(&self) -> CacheStats {
        self.store.read().await.stats()
    }

    /// Stops the sweep task. Idempotent.
    pub fn shutdown(&self) {
        let handle = self
            .sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
            info!("Cache sweep task stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for ApiCache {
    fn drop(&mut self) {
        self.shutdown();
    }
}
