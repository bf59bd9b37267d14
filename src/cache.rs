//! Cache Engine
//!
//! The unified cache: entry store, size/capacity accounting, LRU eviction,
//! lazy and scheduled expiry, invalidation, warming, and health reporting.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           Cache<T>                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  Entry Store + Accountant   │  Background Tasks                 │
//! │  ┌───────────────────────┐  │  ┌─────────────────────────────┐  │
//! │  │ Mutex<                │  │  │ Expiry Sweeper (interval)   │  │
//! │  │   HashMap<K, Entry>,  │  │  │ Warming Scheduler (interval)│  │
//! │  │   total_size          │  │  └─────────────────────────────┘  │
//! │  └───────────────────────┘  │                                   │
//! │            │                │               │                   │
//! │            └────────────────┴───────────────┘                   │
//! │                             │                                   │
//! │              CacheMetrics (lock-free atomics)                   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! One mutex guards the entry map together with its size/count accounting,
//! so `get`'s access-metadata update and `set`'s check-evict-insert sequence
//! are atomic with respect to concurrent callers. Metrics live outside the
//! mutex as atomics. Warming loaders run with the map unlocked; only the
//! resulting `set` takes the lock.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::config::{CacheConfig, CacheConfigUpdate};
use crate::entry::{estimate_size, CacheEntry, EntryOptions};
use crate::error::{Error, Result};
use crate::health::{self, HealthReport, HealthSample};
use crate::invalidation::{InvalidationRule, Pattern};
use crate::metrics::{
    CacheMetrics, DetailedMetrics, EntryDistribution, KeyStat, MemoryUsage, MetricsSnapshot,
};
use crate::policy::EvictionPolicy;
use crate::warming::{priority_order, WarmingStrategy};

/// How many entries the detailed report lists by access count
const TOP_KEYS_LIMIT: usize = 10;

/// A value returned together with its staleness marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedValue<T> {
    /// The cached payload
    pub value: T,
    /// The entry's version tag
    pub version: String,
}

/// Entry map plus its aggregate accounting.
///
/// Invariant: `total_size` equals the sum of `size_bytes` over all live
/// entries. Every insert/remove under the mutex updates both together.
struct StoreState<T> {
    entries: HashMap<String, CacheEntry<T>>,
    total_size: u64,
}

struct Inner<T> {
    config: RwLock<CacheConfig>,
    store: Mutex<StoreState<T>>,
    strategies: Mutex<Vec<WarmingStrategy<T>>>,
    rules: Mutex<Vec<InvalidationRule>>,
    metrics: CacheMetrics,
    policy: EvictionPolicy,
    shutdown: CancellationToken,
    sweeper: Mutex<Option<JoinHandle<()>>>,
    warmer: Mutex<Option<JoinHandle<()>>>,
}

/// In-process cache with TTL expiry, LRU eviction, tag invalidation,
/// scheduled warming, and health reporting.
///
/// Construct one instance per owner and inject it; there is no process-wide
/// singleton. `Cache` is a cheap clonable handle over shared state. Call
/// [`Cache::destroy`] when done to stop the background timers.
pub struct Cache<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Cache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Cache<T>
where
    T: Clone + Serialize + Send + Sync + 'static,
{
    /// Create a cache with the default configuration.
    ///
    /// Must be called from within a tokio runtime; the expiry sweeper (and
    /// the warming scheduler, when enabled) are spawned here.
    pub fn new() -> Result<Self> {
        Self::with_config(CacheConfig::default())
    }

    /// Create a cache with a custom configuration
    pub fn with_config(config: CacheConfig) -> Result<Self> {
        config.validate()?;

        let cache = Self {
            inner: Arc::new(Inner {
                metrics: CacheMetrics::new(config.enable_metrics),
                config: RwLock::new(config.clone()),
                store: Mutex::new(StoreState {
                    entries: HashMap::new(),
                    total_size: 0,
                }),
                strategies: Mutex::new(Vec::new()),
                rules: Mutex::new(Vec::new()),
                policy: EvictionPolicy::default(),
                shutdown: CancellationToken::new(),
                sweeper: Mutex::new(None),
                warmer: Mutex::new(None),
            }),
        };

        cache.spawn_sweeper(config.cleanup_interval);
        if config.enable_warming {
            cache.spawn_warmer(config.warming_interval);
        }

        info!(
            max_size = config.max_size_bytes,
            max_entries = config.max_entries,
            warming = config.enable_warming,
            "cache constructed"
        );
        Ok(cache)
    }

    // =========================================================================
    // Entry Store
    // =========================================================================

    /// Get a value by key.
    ///
    /// Expired entries are removed here on read, without waiting for the
    /// sweeper, and count as misses. A hit updates the entry's access
    /// metadata as a side effect.
    pub fn get(&self, key: &str) -> Option<T> {
        let start = Instant::now();
        let result = self.read_entry(key, None).map(|(value, _)| value);
        self.inner.metrics.record_access_time(start.elapsed());
        result
    }

    /// Get a value together with its version tag.
    ///
    /// When `expected_version` is supplied and does not match, the entry is
    /// evicted immediately and the call is a miss; a mismatch invalidates,
    /// it does not just skip.
    pub fn get_with_version(
        &self,
        key: &str,
        expected_version: Option<&str>,
    ) -> Option<VersionedValue<T>> {
        let start = Instant::now();
        let result = self
            .read_entry(key, expected_version)
            .map(|(value, version)| VersionedValue { value, version });
        self.inner.metrics.record_access_time(start.elapsed());
        result
    }

    /// Shared read path for `get` and `get_with_version`
    fn read_entry(&self, key: &str, expected_version: Option<&str>) -> Option<(T, String)> {
        let mut store = self.inner.store.lock();

        let stale = match store.entries.get(key) {
            None => {
                self.inner.metrics.record_miss();
                return None;
            }
            Some(entry) => {
                entry.is_expired()
                    || expected_version.is_some_and(|expected| expected != entry.version())
            }
        };

        if stale {
            if let Some(entry) = store.entries.remove(key) {
                store.total_size -= entry.size_bytes();
            }
            self.inner.metrics.record_miss();
            return None;
        }

        let entry = store.entries.get_mut(key)?;
        entry.touch();
        self.inner.metrics.record_hit();
        Some((entry.value().clone(), entry.version().to_string()))
    }

    /// Store a value under a key.
    ///
    /// The payload's serialized size is estimated once, here. Replacing an
    /// existing key retires the old entry's size before the new one is
    /// accounted, so the aggregate never transiently over-counts. Capacity
    /// is enforced before insertion: eviction runs until both ceilings hold
    /// or the store is empty, so an accepted `set` never leaves the cache
    /// over its limits.
    pub fn set(&self, key: &str, value: T, options: EntryOptions) -> Result<()> {
        let size = estimate_size(key, &value)?;
        let config = self.inner.config.read().clone();

        if size > config.max_size_bytes {
            return Err(Error::EntryTooLarge {
                key: key.to_string(),
                size,
                capacity: config.max_size_bytes,
            });
        }

        let ttl = options.ttl.unwrap_or(config.default_ttl);
        let version = options
            .version
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let mut store = self.inner.store.lock();

        if let Some(old) = store.entries.remove(key) {
            store.total_size -= old.size_bytes();
        }

        while !store.entries.is_empty()
            && (store.total_size + size > config.max_size_bytes
                || store.entries.len() + 1 > config.max_entries)
        {
            self.evict_one(&mut store);
        }

        store.total_size += size;
        store.entries.insert(
            key.to_string(),
            CacheEntry::new(value, size, ttl, options.tags, version),
        );
        Ok(())
    }

    /// Get several keys sequentially.
    ///
    /// Absent and expired keys are simply missing from the result map.
    pub fn get_batch<K: AsRef<str>>(&self, keys: &[K]) -> HashMap<String, T> {
        let mut results = HashMap::new();
        for key in keys {
            let key = key.as_ref();
            if let Some(value) = self.get(key) {
                results.insert(key.to_string(), value);
            }
        }
        results
    }

    /// Store several entries sequentially.
    ///
    /// No atomicity across the batch: entries stored before a failure stay
    /// stored.
    pub fn set_batch(&self, entries: Vec<(String, T, EntryOptions)>) -> Result<()> {
        for (key, value, options) in entries {
            self.set(&key, value, options)?;
        }
        Ok(())
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.inner.store.lock().entries.len()
    }

    /// Check if the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.inner.store.lock().entries.is_empty()
    }

    /// Aggregate payload size of live entries
    pub fn total_size_bytes(&self) -> u64 {
        self.inner.store.lock().total_size
    }

    /// Remove the LRU victim; must be called with the store locked
    fn evict_one(&self, store: &mut StoreState<T>) {
        if let Some(victim) = self.inner.policy.select_victim(store.entries.iter()) {
            if let Some(entry) = store.entries.remove(&victim) {
                store.total_size -= entry.size_bytes();
                self.inner.metrics.record_eviction();
                debug!(key = %victim, size = entry.size_bytes(), "evicted least-recently-used entry");
            }
        }
    }

    // =========================================================================
    // Invalidation Engine
    // =========================================================================

    /// Remove a single key. Returns the number of entries removed (0 or 1).
    pub fn invalidate(&self, key: &str) -> usize {
        let mut store = self.inner.store.lock();
        match store.entries.remove(key) {
            Some(entry) => {
                store.total_size -= entry.size_bytes();
                1
            }
            None => 0,
        }
    }

    /// Remove a list of keys. Returns the number of entries removed.
    pub fn invalidate_many<K: AsRef<str>>(&self, keys: &[K]) -> usize {
        keys.iter().map(|key| self.invalidate(key.as_ref())).sum()
    }

    /// Remove every entry matching a rule. Returns the number removed.
    ///
    /// The rule's clauses are ORed: key pattern, tag intersection, or
    /// predicate. Any single match invalidates the entry.
    pub fn invalidate_matching(&self, rule: &InvalidationRule) -> usize {
        let mut store = self.inner.store.lock();

        let matched: Vec<String> = store
            .entries
            .iter()
            .filter(|(key, entry)| rule.matches(&entry.view(key)))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &matched {
            if let Some(entry) = store.entries.remove(key) {
                store.total_size -= entry.size_bytes();
            }
        }

        if !matched.is_empty() {
            debug!(removed = matched.len(), ?rule, "rule invalidation");
        }
        matched.len()
    }

    /// Register a standing invalidation rule
    pub fn add_invalidation_rule(&self, rule: InvalidationRule) {
        self.inner.rules.lock().push(rule);
    }

    /// Run every registered rule once. Returns the total entries removed.
    pub fn apply_invalidation_rules(&self) -> usize {
        let rules = self.inner.rules.lock().clone();
        rules
            .iter()
            .map(|rule| self.invalidate_matching(rule))
            .sum()
    }

    /// Empty the store. Returns the number of entries removed.
    ///
    /// Resets the size/count gauges but never the cumulative hit, miss, and
    /// eviction counters; those persist across clears.
    pub fn clear(&self) -> usize {
        let mut store = self.inner.store.lock();
        let removed = store.entries.len();
        store.entries.clear();
        store.total_size = 0;
        removed
    }

    /// Remove every entry whose key matches a pattern.
    ///
    /// Deliberately narrower than [`Cache::invalidate_matching`]: only the
    /// key pattern is consulted, never tags or predicates.
    pub fn clear_matching(&self, pattern: &Pattern) -> usize {
        let mut store = self.inner.store.lock();

        let matched: Vec<String> = store
            .entries
            .keys()
            .filter(|key| pattern.matches(key))
            .cloned()
            .collect();

        for key in &matched {
            if let Some(entry) = store.entries.remove(key) {
                store.total_size -= entry.size_bytes();
            }
        }
        matched.len()
    }

    // =========================================================================
    // Expiry Sweeper
    // =========================================================================

    /// Remove every expired entry now. Returns the number removed.
    ///
    /// The sweeper calls this on its interval; it can also be invoked on
    /// demand. The last-cleanup stamp is updated whether or not anything was
    /// removed. Lazy per-read expiry and sweeping are complementary: either
    /// path may discover a dead entry first, both keep the accounting
    /// consistent.
    pub fn sweep_expired(&self) -> usize {
        let removed = {
            let mut store = self.inner.store.lock();
            let expired: Vec<String> = store
                .entries
                .iter()
                .filter(|(_, entry)| entry.is_expired())
                .map(|(key, _)| key.clone())
                .collect();

            for key in &expired {
                if let Some(entry) = store.entries.remove(key) {
                    store.total_size -= entry.size_bytes();
                }
            }
            expired.len()
        };

        self.inner.metrics.record_cleanup();
        removed
    }

    fn spawn_sweeper(&self, every: Duration) {
        let weak = Arc::downgrade(&self.inner);
        let shutdown = self.inner.shutdown.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = interval(every);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        debug!("expiry sweeper shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        let Some(inner) = weak.upgrade() else { break };
                        let cache = Cache { inner };
                        let removed = cache.sweep_expired();
                        if removed > 0 {
                            debug!(removed, "expiry sweep removed entries");
                        }
                    }
                }
            }
        });

        if let Some(old) = self.inner.sweeper.lock().replace(handle) {
            old.abort();
        }
    }

    // =========================================================================
    // Warming Scheduler
    // =========================================================================

    /// Register a warming strategy
    pub fn add_warming_strategy(&self, strategy: WarmingStrategy<T>) {
        self.inner.strategies.lock().push(strategy);
    }

    /// Run one warming cycle now. Returns the number of keys loaded.
    ///
    /// Strategies run in descending priority order; keys with a fresh entry
    /// are skipped (so back-to-back runs perform zero loader calls). Each
    /// loader runs under the configured timeout, and a failing or hanging
    /// loader is logged and skipped without aborting the rest of the run.
    #[instrument(skip(self))]
    pub async fn warm_cache(&self) -> usize {
        let timeout = self.inner.config.read().loader_timeout;
        let mut strategies = self.inner.strategies.lock().clone();
        priority_order(&mut strategies);

        let mut warmed = 0;
        for strategy in strategies {
            if self.has_fresh_entry(&strategy.key) {
                continue;
            }

            match tokio::time::timeout(timeout, strategy.loader.load()).await {
                Ok(Ok(value)) => {
                    let mut options = EntryOptions::new().tags(strategy.tags.iter().cloned());
                    if let Some(ttl) = strategy.ttl_override {
                        options = options.ttl(ttl);
                    }
                    match self.set(&strategy.key, value, options) {
                        Ok(()) => {
                            self.inner.metrics.record_warming_event();
                            warmed += 1;
                        }
                        Err(error) => {
                            warn!(key = %strategy.key, %error, "warming set failed");
                        }
                    }
                }
                Ok(Err(source)) => {
                    let error = Error::LoaderFailed {
                        key: strategy.key.clone(),
                        source,
                    };
                    warn!(%error, "warming skipped key");
                }
                Err(_) => {
                    let error = Error::LoaderTimeout {
                        key: strategy.key.clone(),
                        timeout,
                    };
                    warn!(%error, "warming skipped key");
                }
            }
        }

        if warmed > 0 {
            debug!(warmed, "cache warming run complete");
        }
        warmed
    }

    fn has_fresh_entry(&self, key: &str) -> bool {
        let store = self.inner.store.lock();
        store.entries.get(key).is_some_and(|entry| !entry.is_expired())
    }

    fn spawn_warmer(&self, every: Duration) {
        let weak = Arc::downgrade(&self.inner);
        let shutdown = self.inner.shutdown.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = interval(every);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        debug!("warming scheduler shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        let Some(inner) = weak.upgrade() else { break };
                        let cache = Cache { inner };
                        cache.warm_cache().await;
                    }
                }
            }
        });

        if let Some(old) = self.inner.warmer.lock().replace(handle) {
            old.abort();
        }
    }

    // =========================================================================
    // Metrics & Health Reporter
    // =========================================================================

    /// Point-in-time metrics snapshot
    pub fn metrics(&self) -> MetricsSnapshot {
        let (total_size, entry_count) = {
            let store = self.inner.store.lock();
            (store.total_size, store.entries.len())
        };
        self.inner.metrics.snapshot(total_size, entry_count)
    }

    /// Extended report: snapshot plus top keys, memory usage, and the
    /// entry size distribution
    pub fn detailed_metrics(&self) -> DetailedMetrics {
        let capacity = self.inner.config.read().max_size_bytes;
        let store = self.inner.store.lock();
        let total_size = store.total_size;
        let entry_count = store.entries.len();

        let mut top_keys: Vec<KeyStat> = store
            .entries
            .iter()
            .map(|(key, entry)| KeyStat {
                key: key.clone(),
                access_count: entry.access_count(),
                size_bytes: entry.size_bytes(),
            })
            .collect();
        top_keys.sort_by(|a, b| b.access_count.cmp(&a.access_count));
        top_keys.truncate(TOP_KEYS_LIMIT);

        let mut entry_distribution = EntryDistribution::default();
        for entry in store.entries.values() {
            entry_distribution.record(entry.size_bytes());
        }
        drop(store);

        DetailedMetrics {
            metrics: self.inner.metrics.snapshot(total_size, entry_count),
            top_keys,
            memory_usage: MemoryUsage {
                used_bytes: total_size,
                capacity_bytes: capacity,
                utilization_percent: (total_size as f64 / capacity as f64) * 100.0,
            },
            entry_distribution,
        }
    }

    /// Derive the health verdict from the live metrics.
    ///
    /// Evaluated fresh on every call, never cached.
    pub fn health_check(&self) -> HealthReport {
        let capacity = self.inner.config.read().max_size_bytes;
        let total_size = self.inner.store.lock().total_size;
        let metrics = &self.inner.metrics;

        health::evaluate(&HealthSample {
            hit_rate: metrics.hit_rate(),
            total_gets: metrics.hits() + metrics.misses(),
            memory_usage_percent: (total_size as f64 / capacity as f64) * 100.0,
            eviction_rate: metrics.eviction_rate(),
        })
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Current configuration
    pub fn config(&self) -> CacheConfig {
        self.inner.config.read().clone()
    }

    /// Apply a partial configuration update.
    ///
    /// The merged configuration is validated before anything changes.
    /// Shrunk capacity ceilings are enforced immediately by eviction.
    /// Toggling warming cancels or reschedules its timer idempotently.
    /// Explicitly changing `enable_metrics` is the one operation that resets
    /// the cumulative counters.
    pub fn update_config(&self, update: CacheConfigUpdate) -> Result<()> {
        let current = self.inner.config.read().clone();
        let merged = update.apply(&current);
        merged.validate()?;

        *self.inner.config.write() = merged.clone();

        if let Some(enable_metrics) = update.enable_metrics {
            if enable_metrics != current.enable_metrics {
                self.inner.metrics.reset();
                self.inner.metrics.set_enabled(enable_metrics);
            }
        }

        {
            let mut store = self.inner.store.lock();
            while !store.entries.is_empty()
                && (store.total_size > merged.max_size_bytes
                    || store.entries.len() > merged.max_entries)
            {
                self.evict_one(&mut store);
            }
        }

        if merged.cleanup_interval != current.cleanup_interval {
            self.spawn_sweeper(merged.cleanup_interval);
        }

        if merged.enable_warming {
            if !current.enable_warming || merged.warming_interval != current.warming_interval {
                self.spawn_warmer(merged.warming_interval);
                debug!(interval = ?merged.warming_interval, "warming scheduled");
            }
        } else if current.enable_warming {
            if let Some(handle) = self.inner.warmer.lock().take() {
                handle.abort();
            }
            debug!("warming disabled");
        }

        Ok(())
    }

    /// Shut the cache down: cancel both background timers and release all
    /// entries. In-flight loader calls are not waited for.
    pub fn destroy(&self) {
        self.inner.shutdown.cancel();
        if let Some(handle) = self.inner.sweeper.lock().take() {
            handle.abort();
        }
        if let Some(handle) = self.inner.warmer.lock().take() {
            handle.abort();
        }
        let removed = self.clear();
        info!(removed, "cache destroyed");
    }
}

// =============================================================================
// Tests
// =============================================================================
