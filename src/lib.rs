//! Toolcache - response caching and filter-change coalescing for the tools
//! directory API
//!
//! Provides a TTL response cache with stale-on-error fallback in front of
//! the upstream API, and debounced, batched filter state that decides when
//! cached fetches are issued.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod filters;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use fetch::{ApiCache, ApiRequest, CacheConfig, CachedFetcher, FetchOutcome};
pub use filters::{DebouncedFilters, FilterConfig, FilterState};
