//! Cache Key Module
//!
//! Normalizes a request path and its query parameters into a canonical key.
//! Two requests that differ only in parameter order, or in parameters that
//! carry no value, map to the same key.

use serde_json::{Map, Value};
use url::{form_urlencoded, Url};

use crate::error::{CacheError, Result};

/// Query parameters attached to a request.
///
/// Values may be null or empty (dropped), scalars, or arrays (one pair per
/// element).
pub type Params = Map<String, Value>;

// == Derive Key ==
/// Builds the cache key for `path` and optional `params`.
///
/// The scheme and host are stripped from absolute URLs. Parameters with
/// null or empty values are dropped, the rest are sorted by name and
/// form-encoded.
///
/// # Errors
/// Returns `CacheError::InvalidRequest` when `path` looks like an absolute
/// URL but cannot be parsed.
pub fn derive_key(path: &str, params: Option<&Params>) -> Result<String> {
    let base = strip_origin(path)?;
    let Some(params) = params else {
        return Ok(base);
    };

    let query = encode_query(params);
    if query.is_empty() {
        return Ok(base);
    }

    let separator = if base.contains('?') { '&' } else { '?' };
    Ok(format!("{}{}{}", base, separator, query))
}

// == Query Pairs ==
/// Flattens params into sorted `(name, value)` pairs, skipping empty values.
pub fn query_pairs(params: &Params) -> Vec<(String, String)> {
    let mut names: Vec<&String> = params.keys().collect();
    names.sort();

    let mut pairs = Vec::new();
    for name in names {
        match &params[name] {
            Value::Array(items) => {
                for item in items {
                    if let Some(text) = scalar_text(item) {
                        pairs.push((name.clone(), text));
                    }
                }
            }
            other => {
                if let Some(text) = scalar_text(other) {
                    pairs.push((name.clone(), text));
                }
            }
        }
    }
    pairs
}

/// Form-encodes params in canonical order.
pub fn encode_query(params: &Params) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (name, value) in query_pairs(params) {
        serializer.append_pair(&name, &value);
    }
    serializer.finish()
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}

/// Drops `scheme://host[:port]` from absolute URLs.
///
/// The remainder is kept verbatim so an absolute URL and the equivalent
/// relative path share a key. An empty remainder becomes `/`.
fn strip_origin(path: &str) -> Result<String> {
    let lower = path.get(..8).unwrap_or(path).to_ascii_lowercase();
    if !(lower.starts_with("http://") || lower.starts_with("https://")) {
        return Ok(path.to_string());
    }

    Url::parse(path)
        .map_err(|e| CacheError::InvalidRequest(format!("Unparseable URL '{}': {}", path, e)))?;

    let after_scheme = path.find("://").map_or(path.len(), |i| i + 3);
    let authority_end = path[after_scheme..]
        .find(['/', '?', '#'])
        .map_or(path.len(), |i| after_scheme + i);
    Ok(match &path[authority_end..] {
        "" => "/".to_string(),
        rest if rest.starts_with('/') => rest.to_string(),
        rest => format!("/{}", rest),
    })
}
