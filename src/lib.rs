//! CoucheCache - In-Process Caching Engine
//!
//! A generic, capacity-bounded, TTL-aware cache for read-heavy workloads:
//! expensive lookups are stored under string keys and served from memory
//! until they expire, are evicted, or are invalidated.
//!
//! # Architecture
//!
//! One [`Cache`] instance per owner; there is no process-wide singleton.
//! The cache is a clonable handle over shared state:
//!
//! ```text
//! Entry Store ← Expiry Sweeper (interval)
//!            ← Warming Scheduler (interval) → pluggable loaders
//!            → Metrics & Health Reporter
//! ```
//!
//! # Features
//!
//! - TTL expiry, lazy on read plus a background sweeper
//! - Byte- and count-bounded capacity with LRU eviction
//! - Invalidation by key, key pattern, tag, or predicate
//! - Scheduled warming with prioritized, timeout-bounded loaders
//! - Version tags for staleness detection
//! - Hit/miss/eviction metrics and a derived health verdict
//!
//! # Example
//!
//! ```no_run
//! use couchecache::{Cache, CacheConfig, EntryOptions};
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() -> couchecache::Result<()> {
//! let cache: Cache<String> = Cache::with_config(CacheConfig {
//!     max_entries: 10_000,
//!     ..Default::default()
//! })?;
//!
//! cache.set(
//!     "user:42",
//!     "profile".to_string(),
//!     EntryOptions::new()
//!         .ttl(Duration::from_secs(60))
//!         .tag("profiles"),
//! )?;
//!
//! assert_eq!(cache.get("user:42"), Some("profile".to_string()));
//! cache.destroy();
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`cache`] - The cache engine itself
//! - [`config`] - Configuration and runtime reconfiguration
//! - [`entry`] - Entries, entry options, and size estimation
//! - [`error`] - Error types
//! - [`health`] - Health evaluation from metrics
//! - [`invalidation`] - Patterns, rules, and predicates
//! - [`metrics`] - Counters, snapshots, and detailed reports
//! - [`policy`] - Eviction policy
//! - [`warming`] - Loaders and warming strategies

pub mod cache;
pub mod config;
pub mod entry;
pub mod error;
pub mod health;
pub mod invalidation;
pub mod metrics;
pub mod policy;
pub mod warming;

mod proptest;

// Re-export commonly used types
pub use cache::{Cache, VersionedValue};
pub use config::{CacheConfig, CacheConfigUpdate};
pub use entry::{CacheEntry, EntryOptions, EntryView};
pub use error::{Error, Result};
pub use health::{HealthReport, HealthStatus};
pub use invalidation::{EntryPredicate, InvalidationRule, Pattern};
pub use metrics::{CacheMetrics, DetailedMetrics, MetricsSnapshot};
pub use policy::EvictionPolicy;
pub use warming::{loader_fn, CacheLoader, FnLoader, WarmingStrategy};
