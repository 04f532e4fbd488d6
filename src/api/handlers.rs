//! API Handlers
//!
//! HTTP request handlers for each gateway endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, RawQuery, State},
    http::{header::HeaderName, HeaderMap, HeaderValue},
    response::IntoResponse,
    Json,
};
use serde_json::Value;

use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::fetch::{ApiCache, ApiRequest, CacheConfig, FetchOutcome, HttpTransport, Transport};
use crate::filters::{patch_from_query_string, to_query_params, FilterState};
use crate::models::{
    params_from_query, HealthResponse, InvalidateRequest, InvalidateResponse, StatsResponse,
};

/// Request header that forces an upstream refresh when set to `true`
pub const FORCE_HEADER: &str = "x-cache-force";
/// Response header reporting `fresh` or `stale`
pub const STATUS_HEADER: &str = "x-cache-status";

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Session cache in front of the upstream API
    pub cache: Arc<ApiCache>,
}

impl AppState {
    /// Creates a new AppState with the given cache.
    pub fn new(cache: ApiCache) -> Self {
        Self {
            cache: Arc::new(cache),
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Builds the HTTP transport and starts the cache sweep task.
    pub fn from_config(config: &Config) -> Result<Self> {
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::from_config(config)?);
        Ok(Self::new(ApiCache::from_config(config, transport)))
    }
}

fn force_requested(headers: &HeaderMap) -> bool {
    headers
        .get(FORCE_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("true") || v == "1")
}

fn cached_response(outcome: FetchOutcome<Value>) -> impl IntoResponse {
    let status = if outcome.is_stale() { "stale" } else { "fresh" };
    (
        [(HeaderName::from_static(STATUS_HEADER), HeaderValue::from_static(status))],
        Json(outcome.into_inner()),
    )
}

/// Handler for GET /api/*path
///
/// Forwards the request through the cache; the query string becomes the
/// request params.
pub async fn proxy_handler(
    State(state): State<AppState>,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Result<impl IntoResponse> {
    let mut request = ApiRequest::get(format!("/{}", path));
    if let Some(query) = query.as_deref().filter(|q| !q.is_empty()) {
        request = request.with_params(params_from_query(query));
    }

    let config = CacheConfig::default().force(force_requested(&headers));
    let outcome = state.cache.cached_fetch(request, config).await?;
    Ok(cached_response(outcome))
}

/// Handler for GET /search
///
/// Reads tool filters from the query string and fetches the matching tools
/// listing through the cache.
pub async fn search_handler(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Result<impl IntoResponse> {
    let mut filters = FilterState::default();
    filters.apply(patch_from_query_string(query.as_deref().unwrap_or_default()));

    let request = ApiRequest::get("/tools").with_params(to_query_params(&filters));
    let config = CacheConfig::default().force(force_requested(&headers));
    let outcome = state.cache.cached_fetch(request, config).await?;
    Ok(cached_response(outcome))
}

/// Handler for DELETE /cache
///
/// Invalidates matching entries, or everything without a selector.
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Query(req): Query<InvalidateRequest>,
) -> Result<Json<InvalidateResponse>> {
    let matcher = req.matcher().map_err(CacheError::InvalidRequest)?;
    let removed = state.cache.invalidate(matcher).await;

    Ok(Json(InvalidateResponse::new(removed)))
}

/// Handler for GET /cache/stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::new(state.cache.stats().await))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
