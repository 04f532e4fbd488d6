//! API Module
//!
//! HTTP handlers and routing for the caching gateway.
//!
//! # Endpoints
//! - `GET /api/*path` - Cached GET against the upstream API
//! - `GET /search` - Cached tools listing for a filter query
//! - `DELETE /cache` - Invalidate cache entries
//! - `GET /cache/stats` - Get cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
