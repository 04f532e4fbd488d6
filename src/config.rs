//! Configuration Module
//!
//! Handles loading and managing gateway configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::DEFAULT_SWEEP_THRESHOLD;

/// Gateway configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Upstream API origin that relative request paths are joined onto
    pub api_base: String,
    /// HTTP server port
    pub server_port: u16,
    /// Entry count above which a write triggers an expired-entry sweep
    pub sweep_threshold: usize,
    /// Background sweep interval in seconds
    pub sweep_interval: u64,
    /// Upstream request timeout in seconds
    pub request_timeout: u64,
    /// Transport-level retries for connection failures
    pub transport_retries: u32,
    /// Default quiet period for filter changes, in milliseconds
    pub debounce_ms: u64,
    /// Default maximum wait for a burst of filter changes, in milliseconds
    pub batch_timeout_ms: u64,
    /// Static bearer token forwarded upstream, if any
    pub admin_token: Option<String>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `API_BASE` - Upstream origin (default: http://localhost:8080/api)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `SWEEP_THRESHOLD` - Entry count that triggers a sweep on write (default: 100)
    /// - `SWEEP_INTERVAL` - Periodic sweep frequency in seconds (default: 300, minimum: 1)
    /// - `REQUEST_TIMEOUT` - Upstream timeout in seconds (default: 30)
    /// - `TRANSPORT_RETRIES` - Retries on connection failure (default: 1)
    /// - `DEBOUNCE_MS` - Filter quiet period (default: 500)
    /// - `BATCH_TIMEOUT_MS` - Filter maximum wait (default: 1500)
    /// - `ADMIN_TOKEN` - Bearer token for upstream calls (default: none)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_base: env::var("API_BASE").unwrap_or(defaults.api_base),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            sweep_threshold: parse_var("SWEEP_THRESHOLD").unwrap_or(defaults.sweep_threshold),
            sweep_interval: parse_var("SWEEP_INTERVAL").unwrap_or(defaults.sweep_interval),
            request_timeout: parse_var("REQUEST_TIMEOUT").unwrap_or(defaults.request_timeout),
            transport_retries: parse_var("TRANSPORT_RETRIES")
                .unwrap_or(defaults.transport_retries),
            debounce_ms: parse_var("DEBOUNCE_MS").unwrap_or(defaults.debounce_ms),
            batch_timeout_ms: parse_var("BATCH_TIMEOUT_MS").unwrap_or(defaults.batch_timeout_ms),
            admin_token: env::var("ADMIN_TOKEN").ok().filter(|t| !t.is_empty()),
        }
    }

    /// Periodic sweep interval, never shorter than one second.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:8080/api".to_string(),
            server_port: 3000,
            sweep_threshold: DEFAULT_SWEEP_THRESHOLD,
            sweep_interval: 300,
            request_timeout: 30,
            transport_retries: 1,
            debounce_ms: 500,
            batch_timeout_ms: 1500,
            admin_token: None,
        }
    }
}
