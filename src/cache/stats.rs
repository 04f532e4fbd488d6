//! Cache Statistics Module
//!
//! Tracks cache performance metrics and a snapshot of entry validity.

use serde::Serialize;

// == Cache Stats ==
/// Cache counters plus a point-in-time view of the stored entries.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Number of reads answered from a valid entry
    pub hits: u64,
    /// Number of reads that found nothing valid
    pub misses: u64,
    /// Number of entries removed by expiry or invalidation
    pub evictions: u64,
    /// Number of failed fetches answered with an expired value
    pub stale_fallbacks: u64,
    /// Current number of entries in the cache, valid or not
    pub total_entries: usize,
    /// Entries still inside their lifetime
    pub valid_entries: usize,
    /// Entries past their lifetime but not yet swept
    pub expired_entries: usize,
    /// Every key currently stored, sorted
    pub keys: Vec<String>,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_evictions(&mut self, count: usize) {
        self.evictions += count as u64;
    }

    pub fn record_stale_fallback(&mut self) {
        self.stale_fallbacks += 1;
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = CacheStats::new();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.evictions, 0);
        assert_eq!(stats.stale_fallbacks, 0);
        assert!(stats.keys.is_empty());
    }

    #[test]
    fn test_hit_rate_no_requests() {
        let stats = CacheStats::new();
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        assert_eq!(stats.hit_rate(), 0.75);
    }

    #[test]
    fn test_record_evictions() {
        let mut stats = CacheStats::new();
        stats.record_evictions(2);
        stats.record_evictions(0);
        stats.record_evictions(3);
        assert_eq!(stats.evictions, 5);
    }
}
