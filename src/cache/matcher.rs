//! Key matching for invalidation.

use regex::Regex;

/// Selects which cache keys an invalidation removes.
#[derive(Debug, Clone)]
pub enum KeyMatcher {
    /// The key must be equal
    Exact(String),
    /// The key must contain the fragment
    Substring(String),
    /// The key must match the regular expression
    Pattern(Regex),
}

impl KeyMatcher {
    pub fn matches(&self, key: &str) -> bool {
        match self {
            KeyMatcher::Exact(exact) => key == exact,
            KeyMatcher::Substring(fragment) => key.contains(fragment.as_str()),
            KeyMatcher::Pattern(regex) => regex.is_match(key),
        }
    }
}

impl From<Regex> for KeyMatcher {
    fn from(regex: Regex) -> Self {
        KeyMatcher::Pattern(regex)
    }
}
