//! Cache Metrics Collection
//!
//! Lock-free counters for monitoring cache behavior. The hit/miss/eviction/
//! warming counters accumulate for the lifetime of the process; `clear()` on
//! the cache resets the entry store but never these. Only an explicit metrics
//! reconfiguration resets them.
//!
//! The hit rate is always recomputed from the raw counters at read time, and
//! the access latency gauge is a true running mean over every `get` observed
//! so far, updated via a compare-and-swap loop.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

/// Cache metrics collector
#[derive(Debug, Default)]
pub struct CacheMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    warming_events: AtomicU64,

    /// Running mean of `get` latency, stored as f64 microseconds bits
    avg_access_us_bits: AtomicU64,
    /// Count of all `get` operations observed (hits + misses)
    access_samples: AtomicU64,

    /// Wall-clock stamp of the last expiry sweep (epoch millis, 0 = never)
    last_cleanup_ms: AtomicI64,

    /// When disabled, all recording is a no-op
    enabled: AtomicBool,
}

impl CacheMetrics {
    /// Create a new metrics collector
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            ..Default::default()
        }
    }

    /// Enable or disable recording
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Check whether recording is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Record a cache hit
    pub fn record_hit(&self) {
        if self.is_enabled() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a cache miss
    pub fn record_miss(&self) {
        if self.is_enabled() {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a capacity eviction
    pub fn record_eviction(&self) {
        if self.is_enabled() {
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a successful warming load
    pub fn record_warming_event(&self) {
        if self.is_enabled() {
            self.warming_events.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Fold one `get` call's latency into the running mean.
    ///
    /// `new_avg = (old_avg * (n - 1) + sample) / n` where n counts every
    /// `get` observed so far, hits and misses alike.
    pub fn record_access_time(&self, elapsed: Duration) {
        if !self.is_enabled() {
            return;
        }

        let sample_us = elapsed.as_secs_f64() * 1_000_000.0;
        let n = self.access_samples.fetch_add(1, Ordering::Relaxed) + 1;

        loop {
            let current_bits = self.avg_access_us_bits.load(Ordering::Relaxed);
            let current = f64::from_bits(current_bits);
            let updated = (current * (n - 1) as f64 + sample_us) / n as f64;

            if self
                .avg_access_us_bits
                .compare_exchange_weak(
                    current_bits,
                    updated.to_bits(),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                )
                .is_ok()
            {
                break;
            }
        }
    }

    /// Stamp the last-cleanup gauge with the current wall-clock time.
    ///
    /// Stamped on every sweep, whether or not anything was removed.
    pub fn record_cleanup(&self) {
        self.last_cleanup_ms
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    /// Get the hit count
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Get the miss count
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Get the eviction count
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Get the warming event count
    pub fn warming_events(&self) -> u64 {
        self.warming_events.load(Ordering::Relaxed)
    }

    /// Hit rate as a percentage, recomputed from the raw counters
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits() as f64;
        let total = hits + self.misses() as f64;
        if total == 0.0 {
            0.0
        } else {
            (hits / total) * 100.0
        }
    }

    /// Evictions as a percentage of all `get` operations
    pub fn eviction_rate(&self) -> f64 {
        let total = (self.hits() + self.misses()) as f64;
        if total == 0.0 {
            0.0
        } else {
            (self.evictions() as f64 / total) * 100.0
        }
    }

    /// Running mean `get` latency
    pub fn average_access_time(&self) -> Duration {
        let us = f64::from_bits(self.avg_access_us_bits.load(Ordering::Relaxed));
        Duration::from_secs_f64(us.max(0.0) / 1_000_000.0)
    }

    /// Wall-clock time of the last expiry sweep, if one has run
    pub fn last_cleanup(&self) -> Option<DateTime<Utc>> {
        match self.last_cleanup_ms.load(Ordering::Relaxed) {
            0 => None,
            ms => Utc.timestamp_millis_opt(ms).single(),
        }
    }

    /// Point-in-time snapshot; size/count gauges are supplied by the store
    pub fn snapshot(&self, total_size_bytes: u64, entry_count: usize) -> MetricsSnapshot {
        MetricsSnapshot {
            hits: self.hits(),
            misses: self.misses(),
            evictions: self.evictions(),
            warming_events: self.warming_events(),
            total_size_bytes,
            entry_count,
            hit_rate: self.hit_rate(),
            average_access_time: self.average_access_time(),
            last_cleanup: self.last_cleanup(),
        }
    }

    /// Reset all counters and gauges.
    ///
    /// Only explicit reconfiguration calls this; `clear()` never does.
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
        self.warming_events.store(0, Ordering::Relaxed);
        self.avg_access_us_bits.store(0, Ordering::Relaxed);
        self.access_samples.store(0, Ordering::Relaxed);
        self.last_cleanup_ms.store(0, Ordering::Relaxed);
    }
}

/// Snapshot of all cache metrics
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Successful reads (process lifetime)
    pub hits: u64,
    /// Failed reads, including expired and version-mismatched entries
    pub misses: u64,
    /// Capacity evictions
    pub evictions: u64,
    /// Successful warming loads
    pub warming_events: u64,
    /// Aggregate payload size of live entries
    pub total_size_bytes: u64,
    /// Number of live entries
    pub entry_count: usize,
    /// Hit percentage over all `get` operations
    pub hit_rate: f64,
    /// Running mean `get` latency
    pub average_access_time: Duration,
    /// Wall-clock time of the last expiry sweep
    pub last_cleanup: Option<DateTime<Utc>>,
}

/// Per-key access statistics for the detailed report
#[derive(Debug, Clone, Serialize)]
pub struct KeyStat {
    /// Entry key
    pub key: String,
    /// Successful reads
    pub access_count: u64,
    /// Serialized size estimate
    pub size_bytes: u64,
}

/// Capacity utilization for the detailed report
#[derive(Debug, Clone, Serialize)]
pub struct MemoryUsage {
    /// Aggregate payload size of live entries
    pub used_bytes: u64,
    /// Configured ceiling
    pub capacity_bytes: u64,
    /// used / capacity as a percentage
    pub utilization_percent: f64,
}

/// Entry counts bucketed by payload size
#[derive(Debug, Clone, Default, Serialize)]
pub struct EntryDistribution {
    /// Entries under 1KB
    pub under_1k: usize,
    /// Entries from 1KB up to 16KB
    pub under_16k: usize,
    /// Entries from 16KB up to 256KB
    pub under_256k: usize,
    /// Entries of 256KB and above
    pub over_256k: usize,
}

impl EntryDistribution {
    /// Add one entry of the given size to the distribution
    pub fn record(&mut self, size_bytes: u64) {
        match size_bytes {
            0..=1023 => self.under_1k += 1,
            1024..=16383 => self.under_16k += 1,
            16384..=262143 => self.under_256k += 1,
            _ => self.over_256k += 1,
        }
    }
}

/// Extended metrics report
#[derive(Debug, Clone, Serialize)]
pub struct DetailedMetrics {
    /// The standard snapshot
    pub metrics: MetricsSnapshot,
    /// Most-read keys, descending by access count
    pub top_keys: Vec<KeyStat>,
    /// Capacity utilization
    pub memory_usage: MemoryUsage,
    /// Entry counts by payload size bucket
    pub entry_distribution: EntryDistribution,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = CacheMetrics::new(true);
        assert_eq!(metrics.hits(), 0);
        assert_eq!(metrics.misses(), 0);
        assert_eq!(metrics.evictions(), 0);
        assert_eq!(metrics.warming_events(), 0);
        assert!(metrics.last_cleanup().is_none());
    }

    #[test]
    fn test_hit_rate_is_recomputed_percentage() {
        let metrics = CacheMetrics::new(true);
        for _ in 0..7 {
            metrics.record_hit();
        }
        for _ in 0..3 {
            metrics.record_miss();
        }
        assert_eq!(metrics.hit_rate(), 70.0);
    }

    #[test]
    fn test_hit_rate_empty() {
        let metrics = CacheMetrics::new(true);
        assert_eq!(metrics.hit_rate(), 0.0);
    }

    #[test]
    fn test_eviction_rate() {
        let metrics = CacheMetrics::new(true);
        for _ in 0..8 {
            metrics.record_hit();
        }
        for _ in 0..2 {
            metrics.record_miss();
        }
        metrics.record_eviction();
        assert!((metrics.eviction_rate() - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_running_mean_access_time() {
        let metrics = CacheMetrics::new(true);

        metrics.record_access_time(Duration::from_micros(100));
        metrics.record_access_time(Duration::from_micros(300));

        let avg = metrics.average_access_time();
        // (100 + 300) / 2 = 200us
        assert!((avg.as_secs_f64() * 1e6 - 200.0).abs() < 1.0);

        metrics.record_access_time(Duration::from_micros(200));
        let avg = metrics.average_access_time();
        assert!((avg.as_secs_f64() * 1e6 - 200.0).abs() < 1.0);
    }

    #[test]
    fn test_disabled_metrics_record_nothing() {
        let metrics = CacheMetrics::new(false);

        metrics.record_hit();
        metrics.record_miss();
        metrics.record_eviction();
        metrics.record_access_time(Duration::from_micros(500));

        assert_eq!(metrics.hits(), 0);
        assert_eq!(metrics.misses(), 0);
        assert_eq!(metrics.evictions(), 0);
        assert_eq!(metrics.average_access_time(), Duration::ZERO);
    }

    #[test]
    fn test_cleanup_stamp() {
        let metrics = CacheMetrics::new(true);
        assert!(metrics.last_cleanup().is_none());

        metrics.record_cleanup();
        let stamp = metrics.last_cleanup().expect("cleanup stamped");
        assert!((Utc::now() - stamp).num_seconds() < 5);
    }

    #[test]
    fn test_snapshot() {
        let metrics = CacheMetrics::new(true);
        metrics.record_hit();
        metrics.record_miss();
        metrics.record_warming_event();

        let snapshot = metrics.snapshot(4096, 3);
        assert_eq!(snapshot.hits, 1);
        assert_eq!(snapshot.misses, 1);
        assert_eq!(snapshot.warming_events, 1);
        assert_eq!(snapshot.total_size_bytes, 4096);
        assert_eq!(snapshot.entry_count, 3);
        assert_eq!(snapshot.hit_rate, 50.0);
    }

    #[test]
    fn test_reset() {
        let metrics = CacheMetrics::new(true);
        metrics.record_hit();
        metrics.record_eviction();
        metrics.record_cleanup();

        metrics.reset();
        assert_eq!(metrics.hits(), 0);
        assert_eq!(metrics.evictions(), 0);
        assert!(metrics.last_cleanup().is_none());
    }

    #[test]
    fn test_entry_distribution_buckets() {
        let mut dist = EntryDistribution::default();
        dist.record(100);
        dist.record(1024);
        dist.record(20_000);
        dist.record(1_000_000);

        assert_eq!(dist.under_1k, 1);
        assert_eq!(dist.under_16k, 1);
        assert_eq!(dist.under_256k, 1);
        assert_eq!(dist.over_256k, 1);
    }

    #[test]
    fn test_snapshot_serializes() {
        let metrics = CacheMetrics::new(true);
        let snapshot = metrics.snapshot(0, 0);
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("hit_rate"));
    }
}
