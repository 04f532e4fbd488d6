//! Request DTOs for the gateway API
//!
//! Defines the structure of incoming query strings.

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use url::form_urlencoded;

use crate::cache::{KeyMatcher, Params};

/// Query for the invalidation endpoint (DELETE /cache)
///
/// At most one of the fields may be set; none clears the whole cache.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvalidateRequest {
    /// Remove keys equal to this
    #[serde(default)]
    pub key: Option<String>,
    /// Remove keys containing this fragment
    #[serde(default)]
    pub pattern: Option<String>,
    /// Remove keys matching this regular expression
    #[serde(default)]
    pub regex: Option<String>,
}

impl InvalidateRequest {
    /// Turns the query into a matcher.
    ///
    /// Returns an error message if more than one selector is given or the
    /// regular expression does not compile.
    pub fn matcher(&self) -> Result<Option<KeyMatcher>, String> {
        let selectors = [&self.key, &self.pattern, &self.regex]
            .iter()
            .filter(|s| s.is_some())
            .count();
        if selectors > 1 {
            return Err("Use only one of key, pattern or regex".to_string());
        }

        if let Some(key) = &self.key {
            return Ok(Some(KeyMatcher::Exact(key.clone())));
        }
        if let Some(pattern) = &self.pattern {
            return Ok(Some(KeyMatcher::Substring(pattern.clone())));
        }
        if let Some(regex) = &self.regex {
            let compiled = Regex::new(regex).map_err(|e| format!("Invalid regex: {}", e))?;
            return Ok(Some(KeyMatcher::Pattern(compiled)));
        }
        Ok(None)
    }
}

/// Converts a raw query string into request params.
///
/// Repeated names become arrays so they survive key derivation and the
/// upstream call.
pub fn params_from_query(query: &str) -> Params {
    let mut params = Params::new();
    for (name, value) in form_urlencoded::parse(query.as_bytes()) {
        let value = Value::String(value.into_owned());
        match params.get_mut(name.as_ref()) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                params.insert(name.into_owned(), value);
            }
        }
    }
    params
}
