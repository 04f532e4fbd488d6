//! Transport Module
//!
//! The underlying network call the cache sits in front of.

use async_trait::async_trait;
use serde_json::Value;

use crate::cache::Params;
use crate::error::TransportError;

// == Method ==
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    /// Methods that change server state and carry the CSRF token.
    pub fn is_state_changing(self) -> bool {
        !matches!(self, Method::Get)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

// == Api Request ==
/// A request against the upstream API.
#[derive(Debug, Clone, Default)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API base, or an absolute URL
    pub path: String,
    pub params: Option<Params>,
    pub body: Option<Value>,
    /// Ask intermediaries not to answer from their own caches
    pub no_cache: bool,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_params(mut self, params: Params) -> Self {
        self.params = Some(params);
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

// == Transport Trait ==
/// Performs a request and decodes the JSON response.
///
/// Implementations own retries, headers and authentication.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> Result<Value, TransportError>;
}
