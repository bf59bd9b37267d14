//! Property-Based Tests for the Cache Engine
//!
//! Uses proptest to verify the accounting and capacity invariants across
//! arbitrary operation sequences.
//!
//! # Test Properties
//!
//! 1. **Capacity**: no sequence of accepted sets leaves the cache over its
//!    byte or entry ceiling
//! 2. **Accounting**: the reported aggregate size always equals the sum of
//!    the live entries' sizes
//! 3. **Clear**: clearing always leaves an empty, zero-sized store

#![cfg(test)]

use ::proptest::prelude::*;

use crate::cache::Cache;
use crate::config::CacheConfig;
use crate::entry::EntryOptions;
use crate::invalidation::{InvalidationRule, Pattern};

// =============================================================================
// Property Strategies
// =============================================================================

/// One step of a cache workload. Keys are drawn from a small fixed space so
/// size accounting stays verifiable through the top-keys report.
#[derive(Debug, Clone)]
enum Op {
    Set { key: u8, len: usize },
    Get { key: u8 },
    Invalidate { key: u8 },
    InvalidateMatching,
    Sweep,
    Clear,
}

/// At most 8 distinct keys, so every live entry appears in the detailed
/// report's top-keys list.
const KEY_SPACE: u8 = 8;

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        5 => (0..KEY_SPACE, 0usize..200).prop_map(|(key, len)| Op::Set { key, len }),
        3 => (0..KEY_SPACE).prop_map(|key| Op::Get { key }),
        1 => (0..KEY_SPACE).prop_map(|key| Op::Invalidate { key }),
        1 => Just(Op::InvalidateMatching),
        1 => Just(Op::Sweep),
        1 => Just(Op::Clear),
    ]
}

fn workload_strategy() -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(op_strategy(), 1..60)
}

fn key_name(key: u8) -> String {
    format!("key:{key}")
}

fn build_cache(max_size_bytes: u64, max_entries: usize) -> Cache<String> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    rt.block_on(async {
        Cache::with_config(CacheConfig {
            max_size_bytes,
            max_entries,
            enable_warming: false,
            ..Default::default()
        })
        .unwrap()
    })
}

/// Sum of per-entry sizes as reported through the public surface
fn reported_entry_size_sum(cache: &Cache<String>) -> u64 {
    cache
        .detailed_metrics()
        .top_keys
        .iter()
        .map(|stat| stat.size_bytes)
        .sum()
}

// =============================================================================
// Capacity and Accounting Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: after every accepted operation, the cache respects both
    /// capacity ceilings and its size accounting matches the live entries.
    #[test]
    fn prop_capacity_and_accounting_hold(
        ops in workload_strategy(),
        max_size in 64u64..2048,
        max_entries in 1usize..6,
    ) {
        let cache = build_cache(max_size, max_entries);

        for op in ops {
            match op {
                Op::Set { key, len } => {
                    // Oversized payloads are rejected; that is allowed, the
                    // invariants below must hold either way
                    let _ = cache.set(&key_name(key), "x".repeat(len), EntryOptions::new());
                }
                Op::Get { key } => {
                    cache.get(&key_name(key));
                }
                Op::Invalidate { key } => {
                    cache.invalidate(&key_name(key));
                }
                Op::InvalidateMatching => {
                    cache.invalidate_matching(&InvalidationRule::matching("key:3"));
                }
                Op::Sweep => {
                    cache.sweep_expired();
                }
                Op::Clear => {
                    cache.clear();
                }
            }

            prop_assert!(cache.len() <= max_entries);
            prop_assert!(cache.total_size_bytes() <= max_size);
            prop_assert_eq!(cache.total_size_bytes(), reported_entry_size_sum(&cache));
        }

        cache.destroy();
    }

    /// Property: a clear always empties the store completely, whatever
    /// happened before it.
    #[test]
    fn prop_clear_empties_store(ops in workload_strategy()) {
        let cache = build_cache(4096, 16);

        for op in ops {
            if let Op::Set { key, len } = op {
                let _ = cache.set(&key_name(key), "x".repeat(len % 50), EntryOptions::new());
            }
        }

        cache.clear();
        prop_assert!(cache.is_empty());
        prop_assert_eq!(cache.total_size_bytes(), 0);
        cache.destroy();
    }

    /// Property: clearing by pattern removes exactly the matching keys and
    /// keeps the accounting consistent for the survivors.
    #[test]
    fn prop_clear_matching_is_exact(keys in prop::collection::hash_set(0..KEY_SPACE, 1..8)) {
        let cache = build_cache(1 << 20, 64);

        for key in &keys {
            cache
                .set(&key_name(*key), "payload".to_string(), EntryOptions::new())
                .unwrap();
        }

        let removed = cache.clear_matching(&Pattern::substring("key:3"));
        let expected = usize::from(keys.contains(&3));

        prop_assert_eq!(removed, expected);
        prop_assert_eq!(cache.len(), keys.len() - expected);
        prop_assert_eq!(cache.total_size_bytes(), reported_entry_size_sum(&cache));
        cache.destroy();
    }
}
