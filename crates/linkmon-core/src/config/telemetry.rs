//! Connection telemetry and aggregation configuration.

use serde::{Deserialize, Serialize};

/// Telemetry engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Seconds between aggregation ticks.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_seconds: u64,
    /// Trailing window in seconds for connection/disconnection rates.
    #[serde(default = "default_rate_window")]
    pub rate_window_seconds: u64,
    /// How long aggregated snapshots are retained, in hours.
    #[serde(default = "default_history_retention")]
    pub history_retention_hours: u64,
    /// Per-message latency above which a per-connection spike alert fires,
    /// in milliseconds.
    #[serde(default = "default_latency_spike")]
    pub latency_spike_ms: f64,
    /// Per-connection error count at which an error-burst alert fires.
    #[serde(default = "default_error_threshold")]
    pub connection_error_threshold: u64,
    /// Capacity of the inline anomaly alert queue. When full, anomaly
    /// alerts are dropped (and logged) rather than blocking the event path.
    #[serde(default = "default_anomaly_queue")]
    pub anomaly_queue_size: usize,
    /// Resource usage estimation coefficients.
    #[serde(default)]
    pub estimator: EstimatorConfig,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            tick_interval_seconds: default_tick_interval(),
            rate_window_seconds: default_rate_window(),
            history_retention_hours: default_history_retention(),
            latency_spike_ms: default_latency_spike(),
            connection_error_threshold: default_error_threshold(),
            anomaly_queue_size: default_anomaly_queue(),
            estimator: EstimatorConfig::default(),
        }
    }
}

/// Coefficients for the heuristic resource estimator.
///
/// The estimates are deliberately coarse arithmetic, not measured values;
/// hosts needing real resource metrics plug in their own estimator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimatorConfig {
    /// Memory floor in megabytes.
    #[serde(default = "default_memory_baseline")]
    pub memory_baseline_mb: f64,
    /// Additional memory per active connection, in kilobytes.
    #[serde(default = "default_memory_per_connection")]
    pub memory_per_connection_kb: f64,
    /// CPU floor in percent.
    #[serde(default = "default_cpu_baseline")]
    pub cpu_baseline_pct: f64,
    /// CPU percent added per message/second.
    #[serde(default = "default_cpu_per_message")]
    pub cpu_per_message_rate: f64,
    /// CPU percent added per active connection.
    #[serde(default = "default_cpu_per_connection")]
    pub cpu_per_connection: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            memory_baseline_mb: default_memory_baseline(),
            memory_per_connection_kb: default_memory_per_connection(),
            cpu_baseline_pct: default_cpu_baseline(),
            cpu_per_message_rate: default_cpu_per_message(),
            cpu_per_connection: default_cpu_per_connection(),
        }
    }
}

fn default_tick_interval() -> u64 {
    10
}

fn default_rate_window() -> u64 {
    60
}

fn default_history_retention() -> u64 {
    24
}

fn default_latency_spike() -> f64 {
    5000.0
}

fn default_error_threshold() -> u64 {
    25
}

fn default_anomaly_queue() -> usize {
    256
}

fn default_memory_baseline() -> f64 {
    10.0
}

fn default_memory_per_connection() -> f64 {
    1.0
}

fn default_cpu_baseline() -> f64 {
    5.0
}

fn default_cpu_per_message() -> f64 {
    0.01
}

fn default_cpu_per_connection() -> f64 {
    0.005
}
