//! API Routes
//!
//! Configures the Axum router with all gateway endpoints.

use axum::{
    routing::{delete, get},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    health_handler, invalidate_handler, proxy_handler, search_handler, stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /api/*path` - Cached upstream GET
/// - `GET /search` - Cached tools listing for a filter query
/// - `DELETE /cache` - Invalidate by `key`, `pattern` or `regex`, or everything
/// - `GET /cache/stats` - Get cache statistics
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/*path", get(proxy_handler))
        .route("/search", get(search_handler))
        .route("/cache", delete(invalidate_handler))
        .route("/cache/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
