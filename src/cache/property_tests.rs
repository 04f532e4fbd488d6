//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check key determinism and store invariants.

use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::time::Duration;

use crate::cache::{derive_key, CacheStore, Params};

// == Test Configuration ==
const TEST_SWEEP_THRESHOLD: usize = 100;
const LONG_LIFETIME: Duration = Duration::from_secs(600);

// == Strategies ==
/// Generates parameter names
fn param_name_strategy() -> impl Strategy<Value = String> {
    "[a-z_]{1,12}"
}

/// Generates non-empty parameter values
fn param_value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 &=?]{1,24}"
}

/// Generates request paths
fn path_strategy() -> impl Strategy<Value = String> {
    "(/[a-z]{1,10}){1,3}"
}

/// Generates cache keys
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_/?=&]{1,64}"
}

/// Unique (name, value) pairs
fn pairs_strategy() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec((param_name_strategy(), param_value_strategy()), 0..8).prop_map(
        |pairs| {
            let mut seen = HashSet::new();
            pairs
                .into_iter()
                .filter(|(name, _)| seen.insert(name.clone()))
                .collect()
        },
    )
}

fn to_params<'a>(pairs: impl Iterator<Item = &'a (String, String)>) -> Params {
    let mut params = Params::new();
    for (name, value) in pairs {
        params.insert(name.clone(), Value::String(value.clone()));
    }
    params
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Reordering parameters never changes the key
    #[test]
    fn prop_key_independent_of_param_order(
        path in path_strategy(),
        pairs in pairs_strategy(),
    ) {
        let forward = to_params(pairs.iter());
        let backward = to_params(pairs.iter().rev());

        prop_assert_eq!(
            derive_key(&path, Some(&forward)).unwrap(),
            derive_key(&path, Some(&backward)).unwrap()
        );
    }

    // Empty-string and null parameters never reach the key
    #[test]
    fn prop_empty_values_excluded(
        path in path_strategy(),
        pairs in pairs_strategy(),
        empty_name in "[A-Z]{1,8}",
        null_name in "[0-9]{1,8}",
    ) {
        let mut params = to_params(pairs.iter());
        let baseline = derive_key(&path, Some(&params)).unwrap();

        params.insert(empty_name.clone(), json!(""));
        params.insert(null_name.clone(), Value::Null);
        let key = derive_key(&path, Some(&params)).unwrap();

        prop_assert_eq!(&key, &baseline);
        let empty_pair = format!("{}=", empty_name);
        let null_pair = format!("{}=", null_name);
        prop_assert!(!key.contains(&empty_pair));
        prop_assert!(!key.contains(&null_pair));
    }

    // A value written is immediately readable
    #[test]
    fn prop_set_then_get(key in key_strategy(), value in any::<u64>(), secs in 1u64..10_000) {
        let mut store = CacheStore::new(TEST_SWEEP_THRESHOLD);
        store.set(key.clone(), value, Duration::from_secs(secs));
        prop_assert_eq!(store.get(&key), Some(value));
    }

    // The latest write wins and only one entry remains
    #[test]
    fn prop_overwrite_semantics(
        key in key_strategy(),
        first in any::<i32>(),
        second in any::<i32>(),
    ) {
        let mut store = CacheStore::new(TEST_SWEEP_THRESHOLD);
        store.set(key.clone(), first, LONG_LIFETIME);
        store.set(key.clone(), second, LONG_LIFETIME);

        prop_assert_eq!(store.get(&key), Some(second));
        prop_assert_eq!(store.len(), 1);
    }

    // Sweeping removes exactly the expired entries, never a valid one
    #[test]
    fn prop_sweep_never_removes_valid_entries(
        entries in prop::collection::vec((key_strategy(), any::<bool>()), 1..150),
    ) {
        let mut store = CacheStore::new(usize::MAX);
        let mut live = HashSet::new();
        let mut dead = HashSet::new();

        for (key, expired) in entries {
            let lifetime = if expired { Duration::ZERO } else { LONG_LIFETIME };
            store.set(key.clone(), (), lifetime);
            if expired {
                live.remove(&key);
                dead.insert(key);
            } else {
                dead.remove(&key);
                live.insert(key);
            }
        }

        let removed = store.sweep();
        prop_assert_eq!(removed, dead.len());
        prop_assert_eq!(store.len(), live.len());
        for key in &live {
            prop_assert!(store.contains_key(key), "valid key {} was swept", key);
        }
    }

    // Writes past the threshold only ever shed expired entries
    #[test]
    fn prop_size_sweep_keeps_valid_entries(
        keys in prop::collection::vec(key_strategy(), 1..60),
    ) {
        let mut store = CacheStore::new(10);
        let unique: HashSet<String> = keys.iter().cloned().collect();
        for key in &keys {
            store.set(key.clone(), 0u8, LONG_LIFETIME);
        }
        prop_assert_eq!(store.len(), unique.len());
    }
}
