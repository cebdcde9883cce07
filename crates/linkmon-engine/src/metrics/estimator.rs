//! Resource usage estimation.

use linkmon_core::config::telemetry::EstimatorConfig;

/// Produces the memory/CPU figures stamped onto each snapshot.
///
/// The default implementation is a linear model over connection and message
/// counts. Hosts with real instrumentation swap in their own.
pub trait ResourceEstimator: Send + Sync {
    /// Estimated resident memory in megabytes.
    fn memory_mb(&self, active_connections: usize) -> f64;
    /// Estimated CPU utilization in percent, capped at 100.
    fn cpu_pct(&self, message_rate: f64, active_connections: usize) -> f64;
}

/// Linear estimator driven by configurable coefficients.
#[derive(Debug, Clone)]
pub struct HeuristicEstimator {
    config: EstimatorConfig,
}

impl HeuristicEstimator {
    pub fn new(config: EstimatorConfig) -> Self {
        Self { config }
    }
}

impl Default for HeuristicEstimator {
    fn default() -> Self {
        Self::new(EstimatorConfig::default())
    }
}

impl ResourceEstimator for HeuristicEstimator {
    fn memory_mb(&self, active_connections: usize) -> f64 {
        self.config.memory_baseline_mb
            + active_connections as f64 * (self.config.memory_per_connection_kb / 1024.0)
    }

    fn cpu_pct(&self, message_rate: f64, active_connections: usize) -> f64 {
        let estimate = self.config.cpu_baseline_pct
            + message_rate * self.config.cpu_per_message_rate
            + active_connections as f64 * self.config.cpu_per_connection;
        estimate.min(100.0)
    }
}
