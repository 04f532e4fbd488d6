//! HTTP Transport Module
//!
//! reqwest-backed [`Transport`] that signs requests for the upstream API:
//! bearer token, `X-Requested-With`, CSRF token on state-changing calls,
//! and cache-busting headers on forced refreshes.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, CACHE_CONTROL, CONTENT_TYPE, EXPIRES, PRAGMA};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::cache::query_pairs;
use crate::config::Config;
use crate::error::{CacheError, Result, TransportError};
use crate::fetch::{ApiRequest, Method, Transport};

pub const CSRF_HEADER: &str = "X-CSRF-Token";
pub const REQUESTED_WITH_HEADER: &str = "X-Requested-With";

// == Token Source ==
/// Supplies the bearer token and hears about rejected ones.
///
/// Clearing the token on 401 is the session's job; the cache keeps its
/// entries.
pub trait TokenSource: Send + Sync {
    fn bearer_token(&self) -> Option<String>;

    fn on_unauthorized(&self) {}
}

/// A fixed token, or none.
#[derive(Debug, Clone, Default)]
pub struct StaticToken(pub Option<String>);

impl TokenSource for StaticToken {
    fn bearer_token(&self) -> Option<String> {
        self.0.clone()
    }
}

// == Http Transport ==
pub struct HttpTransport {
    client: Client,
    base: String,
    tokens: Arc<dyn TokenSource>,
    csrf: Mutex<Option<String>>,
    retries: u32,
}

impl HttpTransport {
    /// # Arguments
    /// * `base` - API origin relative paths are appended to
    /// * `timeout` - Per-attempt request timeout
    /// * `tokens` - Bearer token source
    pub fn new(base: &str, timeout: Duration, tokens: Arc<dyn TokenSource>) -> Result<Self> {
        Url::parse(base).map_err(|e| {
            CacheError::InvalidRequest(format!("Invalid API base '{}': {}", base, e))
        })?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CacheError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base: base.trim_end_matches('/').to_string(),
            tokens,
            csrf: Mutex::new(None),
            retries: 1,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let tokens = Arc::new(StaticToken(config.admin_token.clone()));
        Ok(Self::new(&config.api_base, config.request_timeout(), tokens)?
            .with_retries(config.transport_retries))
    }

    /// Retries applied to connection failures only.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// The CSRF token last received from upstream.
    pub fn csrf_token(&self) -> Option<String> {
        lock(&self.csrf).clone()
    }

    fn url_for(&self, path: &str) -> std::result::Result<Url, TransportError> {
        let raw = if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.base, path.trim_start_matches('/'))
        };
        Url::parse(&raw)
            .map_err(|e| TransportError::Network(format!("invalid URL '{}': {}", raw, e)))
    }

    async fn send_once(&self, request: &ApiRequest) -> std::result::Result<Value, TransportError> {
        let url = self.url_for(&request.path)?;
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self
            .client
            .request(method, url)
            .header(REQUESTED_WITH_HEADER, "XMLHttpRequest")
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = self.tokens.bearer_token() {
            builder = builder.bearer_auth(token);
        }
        if request.method.is_state_changing() {
            if let Some(csrf) = self.csrf_token() {
                builder = builder.header(CSRF_HEADER, csrf);
            }
        } else if request.no_cache {
            builder = builder
                .header(CACHE_CONTROL, "no-cache, no-store, must-revalidate")
                .header(PRAGMA, "no-cache")
                .header(EXPIRES, "0");
        }
        if let Some(params) = &request.params {
            builder = builder.query(&query_pairs(params));
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(classify)?;

        if let Some(csrf) = response
            .headers()
            .get(CSRF_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            *lock(&self.csrf) = Some(csrf.to_string());
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = TransportError::from_status(status.as_u16(), &body);
            match error {
                TransportError::Unauthorized => {
                    warn!(path = %request.path, "Upstream rejected credentials");
                    *lock(&self.csrf) = None;
                    self.tokens.on_unauthorized();
                }
                TransportError::Forbidden(_) => {
                    *lock(&self.csrf) = None;
                }
                _ => {}
            }
            return Err(error);
        }

        if status == StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }
        let bytes = response.bytes().await.map_err(classify)?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|e| TransportError::Decode(e.to_string()))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> std::result::Result<Value, TransportError> {
        let mut attempt = 0;
        loop {
            match self.send_once(request).await {
                Err(error) if error.is_connection_failure() && attempt < self.retries => {
                    attempt += 1;
                    warn!(path = %request.path, attempt, %error, "Retrying upstream request");
                }
                result => {
                    debug!(
                        method = request.method.as_str(),
                        path = %request.path,
                        ok = result.is_ok(),
                        "Upstream request finished"
                    );
                    return result;
                }
            }
        }
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base", &self.base)
            .field("retries", &self.retries)
            .finish_non_exhaustive()
    }
}

fn classify(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout(error.to_string())
    } else if error.is_decode() {
        TransportError::Decode(error.to_string())
    } else {
        TransportError::Network(error.to_string())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(base: &str) -> HttpTransport {
        HttpTransport::new(base, Duration::from_secs(5), Arc::new(StaticToken::default())).unwrap()
    }

    #[test]
    fn test_relative_paths_join_base() {
        let t = transport("http://localhost:8080/api/");
        assert_eq!(
            t.url_for("/tools").unwrap().as_str(),
            "http://localhost:8080/api/tools"
        );
        assert_eq!(
            t.url_for("categories").unwrap().as_str(),
            "http://localhost:8080/api/categories"
        );
    }

    #[test]
    fn test_absolute_paths_kept() {
        let t = transport("http://localhost:8080/api");
        assert_eq!(
            t.url_for("https://cdn.example.com/featured").unwrap().as_str(),
            "https://cdn.example.com/featured"
        );
    }

    #[test]
    fn test_invalid_base_rejected() {
        let tokens = Arc::new(StaticToken::default());
        let result = HttpTransport::new("not a url", Duration::from_secs(1), tokens);
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_network_error() {
        // Port 9 (discard) is closed on test hosts
        let t = transport("http://127.0.0.1:9").with_retries(0);
        let result = t.send(&ApiRequest::get("/tools")).await;
        assert!(matches!(result, Err(ref e) if e.is_connection_failure()));
    }
}
