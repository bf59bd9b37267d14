//! Eviction Policy
//!
//! Victim selection under capacity pressure. The shipped policy is pure LRU:
//! the entry with the oldest `last_accessed` timestamp goes first, regardless
//! of how often it was read. Recency, not frequency, drives eviction.
//!
//! Selection is an O(n) scan over live entries. Ties on `last_accessed` go to
//! the first entry encountered in map iteration order; any deterministic
//! tie-break satisfies the contract, this one is simply the cheapest.

use crate::entry::CacheEntry;

/// Eviction policy for capacity-pressure removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
    /// Least-recently-used by last access timestamp
    #[default]
    Lru,
}

impl EvictionPolicy {
    /// Select the key to evict next, or `None` if the store is empty.
    pub fn select_victim<'a, T, I>(&self, entries: I) -> Option<String>
    where
        T: 'a,
        I: IntoIterator<Item = (&'a String, &'a CacheEntry<T>)>,
    {
        match self {
            EvictionPolicy::Lru => {
                let mut victim: Option<(&'a String, &'a CacheEntry<T>)> = None;
                for (key, entry) in entries {
                    match victim {
                        // Strict comparison: ties keep the first candidate
                        Some((_, best)) if entry.last_accessed() >= best.last_accessed() => {}
                        _ => victim = Some((key, entry)),
                    }
                }
                victim.map(|(key, _)| key.clone())
            }
        }
    }
}

impl std::fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvictionPolicy::Lru => write!(f, "LRU"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
