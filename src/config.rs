//! Cache Configuration
//!
//! Construction-time configuration with validated defaults, plus a partial
//! update type for runtime reconfiguration.

use std::time::Duration;

use crate::error::{Error, Result};

// =============================================================================
// Constants
// =============================================================================

/// Default maximum cache size (50MB)
pub const DEFAULT_MAX_SIZE_BYTES: u64 = 50 * 1024 * 1024;

/// Default per-entry time-to-live (5 minutes)
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Default maximum number of entries
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

/// Default warming interval (10 minutes)
pub const DEFAULT_WARMING_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Default expiry sweep interval (5 minutes)
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Default timeout for a single warming loader invocation
pub const DEFAULT_LOADER_TIMEOUT: Duration = Duration::from_secs(30);

// =============================================================================
// Configuration
// =============================================================================

/// Cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum aggregate payload size in bytes
    pub max_size_bytes: u64,
    /// TTL applied to entries that do not specify one
    pub default_ttl: Duration,
    /// Maximum number of live entries
    pub max_entries: usize,
    /// Record hit/miss/eviction/latency metrics
    pub enable_metrics: bool,
    /// Run the warming scheduler on an interval
    pub enable_warming: bool,
    /// Interval between automatic warming runs
    pub warming_interval: Duration,
    /// Interval between expiry sweeps
    pub cleanup_interval: Duration,
    /// Per-loader timeout during warming
    pub loader_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: DEFAULT_MAX_SIZE_BYTES,
            default_ttl: DEFAULT_TTL,
            max_entries: DEFAULT_MAX_ENTRIES,
            enable_metrics: true,
            enable_warming: true,
            warming_interval: DEFAULT_WARMING_INTERVAL,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
            loader_timeout: DEFAULT_LOADER_TIMEOUT,
        }
    }
}

impl CacheConfig {
    /// Validate the configuration.
    ///
    /// Invalid settings are rejected here, at construction or update time,
    /// never deferred to first use.
    pub fn validate(&self) -> Result<()> {
        if self.max_size_bytes == 0 {
            return Err(Error::InvalidConfig(
                "max_size_bytes must be positive".to_string(),
            ));
        }
        if self.max_entries == 0 {
            return Err(Error::InvalidConfig(
                "max_entries must be positive".to_string(),
            ));
        }
        if self.warming_interval.is_zero() {
            return Err(Error::InvalidConfig(
                "warming_interval must be positive".to_string(),
            ));
        }
        if self.cleanup_interval.is_zero() {
            return Err(Error::InvalidConfig(
                "cleanup_interval must be positive".to_string(),
            ));
        }
        if self.loader_timeout.is_zero() {
            return Err(Error::InvalidConfig(
                "loader_timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Partial configuration for runtime updates.
///
/// Fields left as `None` keep their current values.
#[derive(Debug, Clone, Default)]
pub struct CacheConfigUpdate {
    pub max_size_bytes: Option<u64>,
    pub default_ttl: Option<Duration>,
    pub max_entries: Option<usize>,
    pub enable_metrics: Option<bool>,
    pub enable_warming: Option<bool>,
    pub warming_interval: Option<Duration>,
    pub cleanup_interval: Option<Duration>,
    pub loader_timeout: Option<Duration>,
}

impl CacheConfigUpdate {
    /// Create an empty update
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge this update over a base configuration
    pub fn apply(&self, base: &CacheConfig) -> CacheConfig {
        CacheConfig {
            max_size_bytes: self.max_size_bytes.unwrap_or(base.max_size_bytes),
            default_ttl: self.default_ttl.unwrap_or(base.default_ttl),
            max_entries: self.max_entries.unwrap_or(base.max_entries),
            enable_metrics: self.enable_metrics.unwrap_or(base.enable_metrics),
            enable_warming: self.enable_warming.unwrap_or(base.enable_warming),
            warming_interval: self.warming_interval.unwrap_or(base.warming_interval),
            cleanup_interval: self.cleanup_interval.unwrap_or(base.cleanup_interval),
            loader_timeout: self.loader_timeout.unwrap_or(base.loader_timeout),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.max_size_bytes, 50 * 1024 * 1024);
        assert_eq!(config.default_ttl, Duration::from_secs(300));
        assert_eq!(config.max_entries, 1000);
        assert!(config.enable_metrics);
        assert!(config.enable_warming);
        assert_eq!(config.warming_interval, Duration::from_secs(600));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_max_size_rejected() {
        let config = CacheConfig {
            max_size_bytes: 0,
            ..Default::default()
        };
        assert_matches!(config.validate(), Err(Error::InvalidConfig(_)));
    }

    #[test]
    fn test_zero_max_entries_rejected() {
        let config = CacheConfig {
            max_entries: 0,
            ..Default::default()
        };
        assert_matches!(config.validate(), Err(Error::InvalidConfig(_)));
    }

    #[test]
    fn test_zero_intervals_rejected() {
        let config = CacheConfig {
            warming_interval: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = CacheConfig {
            cleanup_interval: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_update_merges_over_base() {
        let base = CacheConfig::default();
        let update = CacheConfigUpdate {
            max_entries: Some(10),
            enable_warming: Some(false),
            ..Default::default()
        };

        let merged = update.apply(&base);
        assert_eq!(merged.max_entries, 10);
        assert!(!merged.enable_warming);
        // Untouched fields keep their values
        assert_eq!(merged.max_size_bytes, base.max_size_bytes);
        assert_eq!(merged.default_ttl, base.default_ttl);
    }

    #[test]
    fn test_empty_update_is_identity() {
        let base = CacheConfig::default();
        let merged = CacheConfigUpdate::new().apply(&base);
        assert_eq!(merged.max_size_bytes, base.max_size_bytes);
        assert_eq!(merged.max_entries, base.max_entries);
        assert_eq!(merged.enable_warming, base.enable_warming);
    }
}
