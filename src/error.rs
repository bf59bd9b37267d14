//! Error types for the CoucheCache engine

use std::time::Duration;

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the caching engine
#[derive(Error, Debug)]
pub enum Error {
    /// Payload size could not be estimated
    ///
    /// Storing an entry without a size would corrupt capacity accounting,
    /// so the offending `set` is rejected instead.
    #[error("failed to estimate payload size for key '{key}': {source}")]
    SizeEstimation {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Entry is larger than the configured cache capacity
    #[error("entry for key '{key}' ({size} bytes) exceeds cache capacity ({capacity} bytes)")]
    EntryTooLarge { key: String, size: u64, capacity: u64 },

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Warming loader failed
    #[error("loader for key '{key}' failed: {source}")]
    LoaderFailed {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    /// Warming loader exceeded its timeout
    #[error("loader for key '{key}' timed out after {timeout:?}")]
    LoaderTimeout { key: String, timeout: Duration },
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::EntryTooLarge {
            key: "big".to_string(),
            size: 2048,
            capacity: 1024,
        };
        let msg = err.to_string();
        assert!(msg.contains("big"));
        assert!(msg.contains("2048"));
        assert!(msg.contains("1024"));
    }

    #[test]
    fn test_invalid_config_display() {
        let err = Error::InvalidConfig("max_size_bytes must be positive".to_string());
        assert!(err.to_string().contains("max_size_bytes"));
    }

    #[test]
    fn test_loader_timeout_display() {
        let err = Error::LoaderTimeout {
            key: "slow".to_string(),
            timeout: Duration::from_secs(30),
        };
        assert!(err.to_string().contains("slow"));
    }
}
