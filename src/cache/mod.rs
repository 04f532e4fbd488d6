//! Cache Module
//!
//! Provides in-memory response caching with per-entry lifetimes, canonical
//! key derivation and pattern-based invalidation.

mod entry;
mod key;
mod lifetime;
mod matcher;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::CacheEntry;
pub use key::{derive_key, encode_query, query_pairs, Params};
pub use lifetime::{lifetime_for_path, DEFAULT_LIFETIMES, TOOLS_LIFETIME};
pub use matcher::KeyMatcher;
pub use stats::CacheStats;
pub use store::{CacheStore, Lookup};

// == Public Constants ==
/// Entry count above which a write sweeps expired entries
pub const DEFAULT_SWEEP_THRESHOLD: usize = 100;
