//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::Duration;

use tokio::time::Instant;

// == Cache Entry ==
/// A stored value stamped with the moment it was written and its lifetime.
///
/// Entries are never modified after creation; a newer write replaces the
/// whole entry.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// When the entry was written
    pub stored_at: Instant,
    /// How long the entry stays valid after `stored_at`
    pub lifetime: Duration,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new entry stamped with the current instant.
    pub fn new(value: V, lifetime: Duration) -> Self {
        Self {
            value,
            stored_at: Instant::now(),
            lifetime,
        }
    }

    // == Age ==
    /// Time elapsed since the entry was written.
    pub fn age(&self) -> Duration {
        Instant::now().saturating_duration_since(self.stored_at)
    }

    // == Is Valid ==
    /// Returns true while `now - stored_at < lifetime`.
    ///
    /// Boundary condition: once the full lifetime has elapsed the entry is
    /// invalid, so a zero lifetime is never valid.
    pub fn is_valid(&self) -> bool {
        self.age() < self.lifetime
    }

    /// Negation of [`CacheEntry::is_valid`].
    pub fn is_expired(&self) -> bool {
        !self.is_valid()
    }

    // == Time To Live ==
    /// Remaining lifetime, zero once expired.
    pub fn ttl_remaining(&self) -> Duration {
        self.lifetime.saturating_sub(self.age())
    }
}
