//! Cache Entry Types
//!
//! One [`CacheEntry`] per live key: the opaque payload plus the bookkeeping
//! the engine needs for expiry, eviction, and invalidation. The store never
//! inspects the payload itself, only its serialized size computed once at
//! insertion time.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::error::{Error, Result};

/// Estimate the serialized size of a payload in bytes.
///
/// Computed once per `set` and never revised for the lifetime of the entry.
/// A payload that cannot be serialized is a fatal error for that `set` call;
/// storing a zero-size entry would corrupt capacity accounting.
pub fn estimate_size<T: Serialize>(key: &str, value: &T) -> Result<u64> {
    let bytes = serde_json::to_vec(value).map_err(|source| Error::SizeEstimation {
        key: key.to_string(),
        source,
    })?;
    Ok(bytes.len() as u64)
}

/// Options supplied alongside a value on `set`
#[derive(Debug, Clone, Default)]
pub struct EntryOptions {
    /// Time-to-live; falls back to the configured default when `None`.
    /// A zero TTL means the entry is expired on its next access.
    pub ttl: Option<Duration>,
    /// Labels for group invalidation
    pub tags: HashSet<String>,
    /// Staleness marker; a fresh one is generated when not supplied
    pub version: Option<String>,
}

impl EntryOptions {
    /// Create empty options (default TTL, no tags, generated version)
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the TTL
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Add a single tag
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Add multiple tags
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Set the version tag
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

/// A single live cache entry
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    value: T,
    created_at: Instant,
    last_accessed: Instant,
    access_count: u64,
    tags: HashSet<String>,
    size_bytes: u64,
    ttl: Duration,
    version: String,
}

impl<T> CacheEntry<T> {
    /// Create a new entry
    pub fn new(
        value: T,
        size_bytes: u64,
        ttl: Duration,
        tags: HashSet<String>,
        version: String,
    ) -> Self {
        let now = Instant::now();
        Self {
            value,
            created_at: now,
            last_accessed: now,
            access_count: 0,
            tags,
            size_bytes,
            ttl,
            version,
        }
    }

    /// Check if the entry has outlived its TTL.
    ///
    /// A zero TTL expires as soon as any time has elapsed; zero never means
    /// "no expiry".
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() > self.ttl
    }

    /// Record a successful read
    #[inline]
    pub fn touch(&mut self) {
        self.access_count += 1;
        self.last_accessed = Instant::now();
    }

    /// Get the payload
    #[inline]
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Get the serialized size estimate
    #[inline]
    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Get the access count
    #[inline]
    pub fn access_count(&self) -> u64 {
        self.access_count
    }

    /// Get the last access timestamp
    #[inline]
    pub fn last_accessed(&self) -> Instant {
        self.last_accessed
    }

    /// Get the creation timestamp
    #[inline]
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Get the entry tags
    #[inline]
    pub fn tags(&self) -> &HashSet<String> {
        &self.tags
    }

    /// Get the TTL
    #[inline]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get the version tag
    #[inline]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Pin the access timestamp, for tests that need controlled ordering
    #[cfg(test)]
    pub(crate) fn set_last_accessed(&mut self, at: Instant) {
        self.last_accessed = at;
    }

    /// Payload-agnostic view of the entry, used by invalidation predicates
    pub fn view<'a>(&'a self, key: &'a str) -> EntryView<'a> {
        EntryView {
            key,
            tags: &self.tags,
            access_count: self.access_count,
            size_bytes: self.size_bytes,
            version: &self.version,
            age: self.created_at.elapsed(),
            ttl: self.ttl,
        }
    }
}

/// Payload-agnostic snapshot of one entry's metadata.
///
/// Invalidation rules and reporting read entries through this view so they
/// stay independent of the cached value type.
#[derive(Debug, Clone)]
pub struct EntryView<'a> {
    /// The entry's key
    pub key: &'a str,
    /// Labels attached at insertion
    pub tags: &'a HashSet<String>,
    /// Successful reads so far
    pub access_count: u64,
    /// Serialized size estimate
    pub size_bytes: u64,
    /// Version tag
    pub version: &'a str,
    /// Time since creation
    pub age: Duration,
    /// Configured time-to-live
    pub ttl: Duration,
}

// =============================================================================
// Tests
// =============================================================================
