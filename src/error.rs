//! Error types for the response cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Transport Error Enum ==
/// Failure reported by the underlying network call.
///
/// Cloneable so that one failed upstream call can be handed to every caller
/// that was waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connection could not be established or was dropped
    #[error("Network error: {0}")]
    Network(String),

    /// Upstream did not answer in time
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Bearer token missing, expired or rejected (HTTP 401)
    #[error("Unauthorized - token may be expired")]
    Unauthorized,

    /// CSRF token or permissions rejected (HTTP 403)
    #[error("Access denied: {0}")]
    Forbidden(String),

    /// Upstream rate limit hit (HTTP 429)
    #[error("Too many requests. Please slow down.")]
    RateLimited,

    /// Any other non-success status
    #[error("Upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body was not valid JSON
    #[error("Invalid response: {0}")]
    Decode(String),
}

/// Maximum length for upstream bodies kept in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl TransportError {
    /// Classifies a non-success HTTP status.
    pub fn from_status(status: u16, body: &str) -> Self {
        let body = truncate_body(body);
        match status {
            401 => TransportError::Unauthorized,
            403 => TransportError::Forbidden(body),
            429 => TransportError::RateLimited,
            _ => TransportError::Status { status, body },
        }
    }

    /// Whether the failure happened before any response was received.
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, TransportError::Network(_) | TransportError::Timeout(_))
    }
}

fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY_LENGTH;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
}

// == Cache Error Enum ==
/// Unified error type for the cache layer.
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    /// Malformed path or configuration
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Underlying call failed and no prior value was available
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::Transport(TransportError::Unauthorized) => StatusCode::UNAUTHORIZED,
            CacheError::Transport(TransportError::RateLimited) => StatusCode::TOO_MANY_REQUESTS,
            CacheError::Transport(TransportError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            CacheError::Transport(_) => StatusCode::BAD_GATEWAY,
            CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache layer.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_classification() {
        assert_eq!(TransportError::from_status(401, ""), TransportError::Unauthorized);
        assert_eq!(TransportError::from_status(429, ""), TransportError::RateLimited);
        assert!(matches!(
            TransportError::from_status(403, "csrf"),
            TransportError::Forbidden(ref b) if b == "csrf"
        ));
        assert!(matches!(
            TransportError::from_status(503, "down"),
            TransportError::Status { status: 503, .. }
        ));
    }

    #[test]
    fn test_long_body_is_truncated() {
        let body = "x".repeat(MAX_ERROR_BODY_LENGTH * 2);
        match TransportError::from_status(500, &body) {
            TransportError::Status { body, .. } => {
                assert!(body.contains("truncated"));
                assert!(body.len() < MAX_ERROR_BODY_LENGTH * 2);
            }
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn test_transport_error_status_codes() {
        let response = CacheError::from(TransportError::Network("refused".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let response = CacheError::from(TransportError::Unauthorized).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = CacheError::InvalidRequest("bad url".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
