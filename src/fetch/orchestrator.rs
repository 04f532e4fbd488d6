//! Cached Fetch Module
//!
//! Wraps a [`Transport`] with cache reads, cache writes, forced refresh and
//! stale-on-error fallback.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::cache::{derive_key, lifetime_for_path, CacheStore, Lookup};
use crate::error::{CacheError, Result, TransportError};
use crate::fetch::{ApiRequest, Method, Transport};

/// Cache store shared between the orchestrator, the sweep task and handlers.
pub type SharedStore = Arc<RwLock<CacheStore<Value>>>;

type InFlight = Shared<BoxFuture<'static, std::result::Result<Value, TransportError>>>;

// == Cache Config ==
/// Per-call cache options.
#[derive(Debug, Clone, Default)]
pub struct CacheConfig {
    /// Lifetime override; defaults to the endpoint's lifetime
    pub ttl: Option<Duration>,
    /// Key override; defaults to the derived key
    pub key: Option<String>,
    /// Skip the cache read and always call upstream
    pub force: bool,
}

impl CacheConfig {
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}

// == Fetch Outcome ==
/// Where a successful result came from.
///
/// Failures are the `Err` arm of the surrounding `Result`.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<T> {
    /// From a valid cache entry or a successful upstream call
    Fresh(T),
    /// Upstream failed; this is the last value stored for the key
    Stale(T),
}

impl<T> FetchOutcome<T> {
    pub fn is_stale(&self) -> bool {
        matches!(self, FetchOutcome::Stale(_))
    }

    pub fn value(&self) -> &T {
        match self {
            FetchOutcome::Fresh(value) | FetchOutcome::Stale(value) => value,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            FetchOutcome::Fresh(value) | FetchOutcome::Stale(value) => value,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> FetchOutcome<U> {
        match self {
            FetchOutcome::Fresh(value) => FetchOutcome::Fresh(f(value)),
            FetchOutcome::Stale(value) => FetchOutcome::Stale(f(value)),
        }
    }
}

// == Cached Fetcher ==
/// Issues requests through the cache.
///
/// Concurrent misses on the same key share one upstream call unless
/// de-duplication is turned off.
#[derive(Clone)]
pub struct CachedFetcher {
    store: SharedStore,
    transport: Arc<dyn Transport>,
    in_flight: Arc<Mutex<HashMap<String, InFlight>>>,
    dedupe: bool,
}

impl CachedFetcher {
    pub fn new(store: SharedStore, transport: Arc<dyn Transport>) -> Self {
        Self {
            store,
            transport,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            dedupe: true,
        }
    }

    /// With `false`, every miss issues its own upstream call.
    pub fn with_dedupe(mut self, dedupe: bool) -> Self {
        self.dedupe = dedupe;
        self
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    // == Cached Fetch ==
    /// Performs `request`, answering GETs from the cache when possible.
    ///
    /// Non-GET requests always go upstream and are never cached. A GET that
    /// fails upstream is answered with the last stored value for its key,
    /// expired or not, tagged [`FetchOutcome::Stale`]; with nothing stored
    /// the transport error is returned.
    ///
    /// # Errors
    /// - `CacheError::InvalidRequest` if the path is an unparseable URL
    /// - `CacheError::Transport` if upstream failed with no fallback value
    pub async fn cached_fetch(
        &self,
        request: ApiRequest,
        config: CacheConfig,
    ) -> Result<FetchOutcome<Value>> {
        if request.method != Method::Get {
            debug!(method = request.method.as_str(), path = %request.path, "Bypassing cache");
            let value = self.transport.send(&request).await?;
            return Ok(FetchOutcome::Fresh(value));
        }

        let key = match config.key {
            Some(key) => key,
            None => derive_key(&request.path, request.params.as_ref())?,
        };
        let lifetime = config
            .ttl
            .unwrap_or_else(|| lifetime_for_path(&request.path));

        let mut evicted = None;
        if !config.force {
            match self.store.write().await.lookup(&key) {
                Lookup::Hit(value) => {
                    debug!(%key, "Cache hit");
                    return Ok(FetchOutcome::Fresh(value));
                }
                Lookup::Expired(value) => {
                    debug!(%key, "Cache entry expired");
                    evicted = Some(value);
                }
                Lookup::Miss => debug!(%key, "Cache miss"),
            }
        }

        let mut request = request;
        request.no_cache |= config.force;

        match self.fetch_upstream(&key, request, config.force).await {
            Ok(value) => {
                self.store.write().await.set(key, value.clone(), lifetime);
                Ok(FetchOutcome::Fresh(value))
            }
            Err(error) => {
                let mut store = self.store.write().await;
                match store.peek(&key).or(evicted) {
                    Some(stale) => {
                        store.record_stale_fallback();
                        warn!(%key, %error, "Using stale cache due to fetch error");
                        Ok(FetchOutcome::Stale(stale))
                    }
                    None => {
                        warn!(%key, %error, "Fetch failed with nothing cached");
                        Err(error.into())
                    }
                }
            }
        }
    }

    /// Like [`CachedFetcher::cached_fetch`], decoding the value into `T`.
    pub async fn cached_fetch_as<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
        config: CacheConfig,
    ) -> Result<FetchOutcome<T>> {
        let outcome = self.cached_fetch(request, config).await?;
        let stale = outcome.is_stale();
        let value = serde_json::from_value(outcome.into_inner())
            .map_err(|e| CacheError::from(TransportError::Decode(e.to_string())))?;
        Ok(if stale {
            FetchOutcome::Stale(value)
        } else {
            FetchOutcome::Fresh(value)
        })
    }

    async fn fetch_upstream(
        &self,
        key: &str,
        request: ApiRequest,
        force: bool,
    ) -> std::result::Result<Value, TransportError> {
        if !self.dedupe {
            return self.transport.send(&request).await;
        }

        let pending = {
            let mut in_flight = lock(&self.in_flight);
            match in_flight.get(key) {
                Some(pending) if !force => {
                    debug!(%key, "Joining in-flight request");
                    pending.clone()
                }
                _ => {
                    let transport = Arc::clone(&self.transport);
                    let pending = async move { transport.send(&request).await }
                        .boxed()
                        .shared();
                    in_flight.insert(key.to_string(), pending.clone());
                    pending
                }
            }
        };

        let result = pending.clone().await;

        let mut in_flight = lock(&self.in_flight);
        if in_flight
            .get(key)
            .is_some_and(|current| current.ptr_eq(&pending))
        {
            in_flight.remove(key);
        }
        result
    }
}

impl std::fmt::Debug for CachedFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedFetcher")
            .field("dedupe", &self.dedupe)
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
