//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with TTL expiration.

use std::collections::HashMap;
use std::time::Duration;

use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, KeyMatcher};

// == Lookup ==
/// Outcome of reading a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<V> {
    /// A valid entry was found
    Hit(V),
    /// An entry existed but had expired; it has been evicted and its
    /// value is handed back so the caller can still fall back to it
    Expired(V),
    /// Nothing was stored under the key
    Miss,
}

impl<V> Lookup<V> {
    /// The value, only if it was still valid.
    pub fn hit(self) -> Option<V> {
        match self {
            Lookup::Hit(value) => Some(value),
            _ => None,
        }
    }
}

// == Cache Store ==
/// Key to entry mapping with per-entry lifetimes.
///
/// The store is unbounded; once it holds more than `sweep_threshold`
/// entries every write also sweeps out expired entries. Valid entries are
/// never evicted.
#[derive(Debug)]
pub struct CacheStore<V> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<V>>,
    /// Performance statistics
    stats: CacheStats,
    /// Entry count above which a write triggers a sweep
    sweep_threshold: usize,
}

impl<V: Clone> CacheStore<V> {
    // == Constructor ==
    /// Creates an empty store.
    ///
    /// # Arguments
    /// * `sweep_threshold` - Entry count above which writes sweep expired entries
    pub fn new(sweep_threshold: usize) -> Self {
        Self {
            entries: HashMap::new(),
            stats: CacheStats::new(),
            sweep_threshold,
        }
    }

    // == Set ==
    /// Stores `value` under `key`, replacing any existing entry and
    /// restarting its lifetime.
    pub fn set(&mut self, key: impl Into<String>, value: V, lifetime: Duration) {
        self.entries
            .insert(key.into(), CacheEntry::new(value, lifetime));

        if self.entries.len() > self.sweep_threshold {
            let removed = self.sweep();
            debug!(
                removed,
                remaining = self.entries.len(),
                "Size-triggered sweep"
            );
        }
    }

    // == Lookup ==
    /// Reads a key, evicting it if it has expired.
    pub fn lookup(&mut self, key: &str) -> Lookup<V> {
        let valid = match self.entries.get(key) {
            Some(entry) => entry.is_valid(),
            None => {
                self.stats.record_miss();
                return Lookup::Miss;
            }
        };

        if valid {
            self.stats.record_hit();
            return match self.entries.get(key) {
                Some(entry) => Lookup::Hit(entry.value.clone()),
                None => Lookup::Miss,
            };
        }

        self.stats.record_miss();
        self.stats.record_evictions(1);
        match self.entries.remove(key) {
            Some(entry) => Lookup::Expired(entry.value),
            None => Lookup::Miss,
        }
    }

    // == Get ==
    /// Returns the value only if the entry is still valid.
    ///
    /// An expired entry is removed as a side effect.
    pub fn get(&mut self, key: &str) -> Option<V> {
        self.lookup(key).hit()
    }

    // == Peek ==
    /// Returns whatever is stored under `key`, expired or not, without
    /// touching statistics or evicting.
    pub fn peek(&self, key: &str) -> Option<V> {
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    // == Sweep ==
    /// Removes all expired entries from the cache.
    ///
    /// Returns the number of entries removed.
    pub fn sweep(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_valid());
        let removed = before - self.entries.len();
        self.stats.record_evictions(removed);
        removed
    }

    // == Invalidate ==
    /// Removes every entry whose key matches; `None` clears the store.
    ///
    /// Returns the number of entries removed.
    pub fn invalidate(&mut self, matcher: Option<&KeyMatcher>) -> usize {
        let before = self.entries.len();
        match matcher {
            Some(matcher) => self.entries.retain(|key, _| !matcher.matches(key)),
            None => self.entries.clear(),
        }
        let removed = before - self.entries.len();
        self.stats.record_evictions(removed);
        removed
    }

    /// Drops every entry.
    pub fn clear(&mut self) -> usize {
        self.invalidate(None)
    }

    pub fn record_stale_fallback(&mut self) {
        self.stats.record_stale_fallback();
    }

    // == Stats ==
    /// Returns counters plus a snapshot of the current entries.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.total_entries = self.entries.len();
        stats.valid_entries = self.entries.values().filter(|e| e.is_valid()).count();
        stats.expired_entries = stats.total_entries - stats.valid_entries;
        stats.keys = self.entries.keys().cloned().collect();
        stats.keys.sort();
        stats
    }

    /// Returns the current number of entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn sweep_threshold(&self) -> usize {
        self.sweep_threshold
    }
}
