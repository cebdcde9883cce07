//! Health check threshold configuration.

use serde::{Deserialize, Serialize};

/// Thresholds for the health evaluator's checks.
///
/// Each threshold backs one pass/fail check; the overall verdict is derived
/// from how many checks fail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Maximum healthy number of active connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Maximum healthy error rate, in errors per minute.
    #[serde(default = "default_error_rate")]
    pub error_rate_per_min: f64,
    /// Maximum healthy average latency, in milliseconds.
    #[serde(default = "default_latency")]
    pub latency_ms: f64,
    /// Maximum healthy estimated memory footprint, in megabytes.
    #[serde(default = "default_memory")]
    pub memory_mb: f64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            error_rate_per_min: default_error_rate(),
            latency_ms: default_latency(),
            memory_mb: default_memory(),
        }
    }
}

fn default_max_connections() -> usize {
    1000
}

fn default_error_rate() -> f64 {
    50.0
}

fn default_latency() -> f64 {
    5000.0
}

fn default_memory() -> f64 {
    500.0
}
