//! Cache Warming
//!
//! Proactive population of entries before a caller would otherwise miss.
//! Callers register [`WarmingStrategy`] entries wrapping their own fetch
//! functions behind the [`CacheLoader`] port; the scheduler re-sorts them by
//! descending priority on every run, skips keys that are still fresh, and
//! tolerates individual loader failures without aborting the rest of the run.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

/// Port for the fetch function backing one warmed key.
///
/// Loaders may be slow or I/O-bound; the scheduler invokes them under a
/// bounded timeout so a hung loader cannot stall the run.
#[async_trait]
pub trait CacheLoader<T>: Send + Sync {
    /// Produce the value for the strategy's key
    async fn load(&self) -> anyhow::Result<T>;
}

/// Adapter implementing [`CacheLoader`] from an async closure
pub struct FnLoader<F>(F);

#[async_trait]
impl<T, F, Fut> CacheLoader<T> for FnLoader<F>
where
    T: Send + 'static,
    F: Fn() -> Fut + Send + Sync,
    Fut: std::future::Future<Output = anyhow::Result<T>> + Send,
{
    async fn load(&self) -> anyhow::Result<T> {
        (self.0)().await
    }
}

/// Wrap an async closure as a [`CacheLoader`]
pub fn loader_fn<F>(f: F) -> FnLoader<F> {
    FnLoader(f)
}

/// A registered warming target.
///
/// Registered once at configuration time and re-evaluated on every warming
/// cycle; strategies themselves never expire or mutate.
pub struct WarmingStrategy<T> {
    /// Key to keep warm
    pub key: String,
    /// Higher priorities warm first
    pub priority: i32,
    /// Fetch function for the key's value
    pub loader: Arc<dyn CacheLoader<T>>,
    /// Tags applied to the warmed entry
    pub tags: HashSet<String>,
    /// TTL for the warmed entry; falls back to the cache default
    pub ttl_override: Option<Duration>,
}

impl<T> WarmingStrategy<T> {
    /// Create a strategy with default priority and no tags
    pub fn new(key: impl Into<String>, loader: Arc<dyn CacheLoader<T>>) -> Self {
        Self {
            key: key.into(),
            priority: 0,
            loader,
            tags: HashSet::new(),
            ttl_override: None,
        }
    }

    /// Set the priority
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Add a tag to the warmed entry
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Override the TTL of the warmed entry
    pub fn ttl_override(mut self, ttl: Duration) -> Self {
        self.ttl_override = Some(ttl);
        self
    }
}

impl<T> Clone for WarmingStrategy<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            priority: self.priority,
            loader: Arc::clone(&self.loader),
            tags: self.tags.clone(),
            ttl_override: self.ttl_override,
        }
    }
}

impl<T> std::fmt::Debug for WarmingStrategy<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WarmingStrategy")
            .field("key", &self.key)
            .field("priority", &self.priority)
            .field("tags", &self.tags)
            .field("ttl_override", &self.ttl_override)
            .finish()
    }
}

/// Order strategies for one warming run: descending priority.
pub(crate) fn priority_order<T>(strategies: &mut [WarmingStrategy<T>]) {
    strategies.sort_by(|a, b| b.priority.cmp(&a.priority));
}

// =============================================================================
// Tests
// =============================================================================
