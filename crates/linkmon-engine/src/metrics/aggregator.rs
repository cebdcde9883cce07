//! Snapshot computation over the connection registry.

use std::sync::Arc;
use std::time::Instant;

use chrono::{Duration, Utc};
use tracing::warn;

use linkmon_core::config::telemetry::TelemetryConfig;
use linkmon_core::metrics::ServiceMetricsSnapshot;
use linkmon_core::types::ConnectionStatus;

use crate::connection::record::ConnectionSummary;
use crate::connection::registry::ConnectionRegistry;
use crate::metrics::estimator::{HeuristicEstimator, ResourceEstimator};
use crate::metrics::history::SnapshotHistory;

/// Computes one [`ServiceMetricsSnapshot`] per tick from a registry scan.
///
/// All derived figures come from the scanned copies, so a snapshot is
/// internally consistent even while the registry keeps mutating underneath.
pub struct MetricsAggregator {
    registry: Arc<ConnectionRegistry>,
    history: SnapshotHistory,
    estimator: Box<dyn ResourceEstimator>,
    rate_window: Duration,
    rate_window_seconds: f64,
    started: Instant,
}

impl std::fmt::Debug for MetricsAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsAggregator")
            .field("history_len", &self.history.len())
            .finish()
    }
}

impl MetricsAggregator {
    pub fn new(config: &TelemetryConfig, registry: Arc<ConnectionRegistry>) -> Self {
        let estimator = Box::new(HeuristicEstimator::new(config.estimator.clone()));
        Self::with_estimator(config, registry, estimator)
    }

    /// Builds an aggregator with a caller-supplied resource estimator.
    pub fn with_estimator(
        config: &TelemetryConfig,
        registry: Arc<ConnectionRegistry>,
        estimator: Box<dyn ResourceEstimator>,
    ) -> Self {
        let window_seconds = config.rate_window_seconds.max(1);
        Self {
            registry,
            history: SnapshotHistory::new(config.history_retention_hours),
            estimator,
            rate_window: Duration::seconds(window_seconds as i64),
            rate_window_seconds: window_seconds as f64,
            started: Instant::now(),
        }
    }

    /// Scans the registry and produces the next snapshot, appending it to
    /// the retained history.
    pub fn aggregate(&self) -> Arc<ServiceMetricsSnapshot> {
        let records = self.registry.snapshot_all();
        let now = Utc::now();

        let total_connections = records.len();
        let active_connections = records
            .iter()
            .filter(|r| r.status == ConnectionStatus::Connected)
            .count();
        let counter = self.registry.active_connections();
        if active_connections != counter {
            warn!(
                scanned = active_connections,
                counter, "scanned active count differs from maintained counter"
            );
        }

        let window_start = now - self.rate_window;
        let opened_in_window = records
            .iter()
            .filter(|r| r.connected_at >= window_start)
            .count();
        let closed_in_window = records
            .iter()
            .filter(|r| {
                r.status == ConnectionStatus::Disconnected && r.last_activity >= window_start
            })
            .count();
        let connection_rate = opened_in_window as f64 / self.rate_window_seconds;
        let disconnection_rate = closed_in_window as f64 / self.rate_window_seconds;

        let total_messages: u64 = records.iter().map(ConnectionSummary::total_messages).sum();
        let total_errors: u64 = records.iter().map(|r| r.errors).sum();
        let total_bytes: u64 = records.iter().map(|r| r.bytes_transferred).sum();

        // A sub-second uptime would turn a handful of events into absurd
        // per-second rates.
        let elapsed = self.started.elapsed().as_secs_f64().max(1.0);
        let message_rate = total_messages as f64 / elapsed;
        let error_rate = total_errors as f64 / elapsed * 60.0;
        let bandwidth_bytes_per_sec = total_bytes as f64 / elapsed;

        let (avg_latency_ms, p95_latency_ms) = latency_stats(&records);

        let memory_usage_mb = self.estimator.memory_mb(active_connections);
        let cpu_usage_pct = self.estimator.cpu_pct(message_rate, active_connections);

        let snapshot = Arc::new(ServiceMetricsSnapshot {
            timestamp: now,
            total_connections,
            active_connections,
            connection_rate,
            disconnection_rate,
            message_rate,
            error_rate,
            avg_latency_ms,
            p95_latency_ms,
            bandwidth_bytes_per_sec,
            memory_usage_mb,
            cpu_usage_pct,
            uptime_seconds: self.started.elapsed().as_secs(),
        });
        self.history.push(Arc::clone(&snapshot));
        snapshot
    }

    /// Retained snapshots, oldest evicted by age.
    pub fn history(&self) -> &SnapshotHistory {
        &self.history
    }

    pub fn uptime(&self) -> std::time::Duration {
        self.started.elapsed()
    }
}

/// Mean and 95th-percentile over every connection's latency samples.
///
/// The percentile uses the nearest-rank method on the sorted samples:
/// `ceil(n * 0.95)` as a one-based rank. No samples yields zeros.
fn latency_stats(records: &[ConnectionSummary]) -> (f64, f64) {
    let mut samples: Vec<f64> = records
        .iter()
        .flat_map(|r| r.latency_samples.iter().copied())
        .collect();
    if samples.is_empty() {
        return (0.0, 0.0);
    }
    samples.sort_by(f64::total_cmp);
    let avg = samples.iter().sum::<f64>() / samples.len() as f64;
    let rank = (samples.len() as f64 * 0.95).ceil() as usize;
    let index = rank.saturating_sub(1).min(samples.len() - 1);
    (avg, samples[index])
}
