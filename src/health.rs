//! Cache Health Reporting
//!
//! Derives a health verdict from the live metrics. The verdict is computed
//! on demand from three independent threshold checks and is never cached:
//!
//! - hit rate below 50% of all reads
//! - memory usage above 80% of capacity
//! - eviction rate above 10% of all reads
//!
//! Zero issues is `Healthy`, one or two is `Warning`, three or more is
//! `Critical`. The bucketing is exact counts, not a weighted score.

use serde::{Deserialize, Serialize};

/// Hit-rate percentage below which the cache is considered cold
pub const LOW_HIT_RATE_THRESHOLD: f64 = 50.0;

/// Memory utilization percentage above which the cache is under pressure
pub const HIGH_MEMORY_THRESHOLD: f64 = 80.0;

/// Eviction percentage (of all reads) above which churn is excessive
pub const HIGH_EVICTION_THRESHOLD: f64 = 10.0;

/// Health verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// No issues detected
    Healthy,
    /// One or two issues detected
    Warning,
    /// Three or more issues detected
    Critical,
}

impl HealthStatus {
    /// Check if the verdict is healthy
    pub fn is_healthy(&self) -> bool {
        *self == HealthStatus::Healthy
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "Healthy"),
            HealthStatus::Warning => write!(f, "Warning"),
            HealthStatus::Critical => write!(f, "Critical"),
        }
    }
}

/// Health check result
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    /// Overall verdict
    pub status: HealthStatus,
    /// Detected issues, one line each
    pub issues: Vec<String>,
    /// Suggested remediations, parallel to `issues`
    pub recommendations: Vec<String>,
}

/// Inputs to the health evaluation, sampled from the live cache
#[derive(Debug, Clone, Copy)]
pub struct HealthSample {
    /// Hit percentage over all `get` operations
    pub hit_rate: f64,
    /// Total `get` operations observed (hits + misses)
    pub total_gets: u64,
    /// Memory utilization percentage (used / capacity * 100)
    pub memory_usage_percent: f64,
    /// Evictions as a percentage of all `get` operations
    pub eviction_rate: f64,
}

/// Evaluate the threshold checks against a sample.
pub fn evaluate(sample: &HealthSample) -> HealthReport {
    let mut issues = Vec::new();
    let mut recommendations = Vec::new();

    // A cache that has seen no reads yet is not "cold", just unused
    if sample.total_gets > 0 && sample.hit_rate < LOW_HIT_RATE_THRESHOLD {
        issues.push(format!("low hit rate: {:.1}%", sample.hit_rate));
        recommendations
            .push("review TTL settings or add warming strategies for hot keys".to_string());
    }

    if sample.memory_usage_percent > HIGH_MEMORY_THRESHOLD {
        issues.push(format!(
            "high memory usage: {:.1}% of capacity",
            sample.memory_usage_percent
        ));
        recommendations.push("increase max_size_bytes or lower entry TTLs".to_string());
    }

    if sample.total_gets > 0 && sample.eviction_rate > HIGH_EVICTION_THRESHOLD {
        issues.push(format!(
            "high eviction rate: {:.1}% of reads",
            sample.eviction_rate
        ));
        recommendations.push("increase capacity or reduce cached payload sizes".to_string());
    }

    let status = match issues.len() {
        0 => HealthStatus::Healthy,
        1 | 2 => HealthStatus::Warning,
        _ => HealthStatus::Critical,
    };

    HealthReport {
        status,
        issues,
        recommendations,
    }
}

// =============================================================================
// Tests
// =============================================================================
