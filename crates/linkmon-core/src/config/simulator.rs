//! Synthetic traffic generator configuration.

use serde::{Deserialize, Serialize};

/// Settings for the built-in traffic simulator.
///
/// Off by default; used for demos and for verifying channel wiring without
/// a real transport attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Whether the simulator runs at startup.
    #[serde(default)]
    pub enabled: bool,
    /// Number of synthetic connections to keep open.
    #[serde(default = "default_connections")]
    pub connections: usize,
    /// Milliseconds between simulated message batches.
    #[serde(default = "default_message_interval")]
    pub message_interval_ms: u64,
    /// Probability that a given message is accompanied by an error.
    #[serde(default = "default_error_probability")]
    pub error_probability: f64,
    /// Probability that a connection drops and is replaced per batch.
    #[serde(default = "default_disconnect_probability")]
    pub disconnect_probability: f64,
    /// Mean simulated round-trip latency in milliseconds.
    #[serde(default = "default_latency_mean")]
    pub latency_mean_ms: f64,
    /// Uniform jitter applied around the mean latency.
    #[serde(default = "default_latency_jitter")]
    pub latency_jitter_ms: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            connections: default_connections(),
            message_interval_ms: default_message_interval(),
            error_probability: default_error_probability(),
            disconnect_probability: default_disconnect_probability(),
            latency_mean_ms: default_latency_mean(),
            latency_jitter_ms: default_latency_jitter(),
        }
    }
}

fn default_connections() -> usize {
    25
}

fn default_message_interval() -> u64 {
    200
}

fn default_error_probability() -> f64 {
    0.02
}

fn default_disconnect_probability() -> f64 {
    0.01
}

fn default_latency_mean() -> f64 {
    80.0
}

fn default_latency_jitter() -> f64 {
    40.0
}
