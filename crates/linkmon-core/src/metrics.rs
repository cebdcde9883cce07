//! Service-wide metrics snapshot value and metric addressing.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// One immutable, timestamped aggregate over every tracked connection.
///
/// Produced once per aggregation tick and pushed into a bounded history;
/// consumers (health evaluation, alert rules, the HTTP surface) only ever
/// see completed snapshots, never partial state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceMetricsSnapshot {
    /// When this snapshot was taken.
    pub timestamp: DateTime<Utc>,
    /// All tracked connections, regardless of status.
    pub total_connections: usize,
    /// Connections currently in `connected` status.
    pub active_connections: usize,
    /// New connections per second over the trailing rate window.
    pub connection_rate: f64,
    /// Disconnections per second over the trailing rate window.
    pub disconnection_rate: f64,
    /// Messages per second since process start.
    pub message_rate: f64,
    /// Errors per minute since process start.
    pub error_rate: f64,
    /// Mean round-trip latency across all sample buffers, in milliseconds.
    pub avg_latency_ms: f64,
    /// 95th-percentile round-trip latency, in milliseconds.
    pub p95_latency_ms: f64,
    /// Bytes per second since process start.
    pub bandwidth_bytes_per_sec: f64,
    /// Estimated memory footprint in megabytes.
    pub memory_usage_mb: f64,
    /// Estimated CPU utilization in percent, capped at 100.
    pub cpu_usage_pct: f64,
    /// Seconds since the engine started.
    pub uptime_seconds: u64,
}

/// Addresses one numeric field of a [`ServiceMetricsSnapshot`].
///
/// Threshold rules are configured against these names, so adding a snapshot
/// field means adding a key here if rules should be able to watch it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKey {
    TotalConnections,
    ActiveConnections,
    ConnectionRate,
    DisconnectionRate,
    MessageRate,
    ErrorRate,
    AvgLatencyMs,
    P95LatencyMs,
    BandwidthBytesPerSec,
    MemoryUsageMb,
    CpuUsagePct,
    UptimeSeconds,
}

impl MetricKey {
    /// Returns the snake_case name used in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TotalConnections => "total_connections",
            Self::ActiveConnections => "active_connections",
            Self::ConnectionRate => "connection_rate",
            Self::DisconnectionRate => "disconnection_rate",
            Self::MessageRate => "message_rate",
            Self::ErrorRate => "error_rate",
            Self::AvgLatencyMs => "avg_latency_ms",
            Self::P95LatencyMs => "p95_latency_ms",
            Self::BandwidthBytesPerSec => "bandwidth_bytes_per_sec",
            Self::MemoryUsageMb => "memory_usage_mb",
            Self::CpuUsagePct => "cpu_usage_pct",
            Self::UptimeSeconds => "uptime_seconds",
        }
    }

    /// Extracts the addressed value from a snapshot.
    pub fn extract(&self, snapshot: &ServiceMetricsSnapshot) -> f64 {
        match self {
            Self::TotalConnections => snapshot.total_connections as f64,
            Self::ActiveConnections => snapshot.active_connections as f64,
            Self::ConnectionRate => snapshot.connection_rate,
            Self::DisconnectionRate => snapshot.disconnection_rate,
            Self::MessageRate => snapshot.message_rate,
            Self::ErrorRate => snapshot.error_rate,
            Self::AvgLatencyMs => snapshot.avg_latency_ms,
            Self::P95LatencyMs => snapshot.p95_latency_ms,
            Self::BandwidthBytesPerSec => snapshot.bandwidth_bytes_per_sec,
            Self::MemoryUsageMb => snapshot.memory_usage_mb,
            Self::CpuUsagePct => snapshot.cpu_usage_pct,
            Self::UptimeSeconds => snapshot.uptime_seconds as f64,
        }
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MetricKey {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "total_connections" => Ok(Self::TotalConnections),
            "active_connections" => Ok(Self::ActiveConnections),
            "connection_rate" => Ok(Self::ConnectionRate),
            "disconnection_rate" => Ok(Self::DisconnectionRate),
            "message_rate" => Ok(Self::MessageRate),
            "error_rate" => Ok(Self::ErrorRate),
            "avg_latency_ms" => Ok(Self::AvgLatencyMs),
            "p95_latency_ms" => Ok(Self::P95LatencyMs),
            "bandwidth_bytes_per_sec" => Ok(Self::BandwidthBytesPerSec),
            "memory_usage_mb" => Ok(Self::MemoryUsageMb),
            "cpu_usage_pct" => Ok(Self::CpuUsagePct),
            "uptime_seconds" => Ok(Self::UptimeSeconds),
            other => Err(EngineError::validation(format!(
                "unknown metric key '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_snapshot() -> ServiceMetricsSnapshot {
        ServiceMetricsSnapshot {
            timestamp: Utc::now(),
            total_connections: 12,
            active_connections: 7,
            connection_rate: 0.5,
            disconnection_rate: 0.1,
            message_rate: 42.0,
            error_rate: 3.0,
            avg_latency_ms: 85.0,
            p95_latency_ms: 210.0,
            bandwidth_bytes_per_sec: 2048.0,
            memory_usage_mb: 10.5,
            cpu_usage_pct: 6.2,
            uptime_seconds: 3600,
        }
    }

    #[test]
    fn test_extract_matches_fields() {
        let snap = sample_snapshot();
        assert_eq!(MetricKey::ActiveConnections.extract(&snap), 7.0);
        assert_eq!(MetricKey::ErrorRate.extract(&snap), 3.0);
        assert_eq!(MetricKey::P95LatencyMs.extract(&snap), 210.0);
        assert_eq!(MetricKey::UptimeSeconds.extract(&snap), 3600.0);
    }

    #[test]
    fn test_metric_key_parse_roundtrip() {
        let keys = [
            MetricKey::TotalConnections,
            MetricKey::ActiveConnections,
            MetricKey::ConnectionRate,
            MetricKey::DisconnectionRate,
            MetricKey::MessageRate,
            MetricKey::ErrorRate,
            MetricKey::AvgLatencyMs,
            MetricKey::P95LatencyMs,
            MetricKey::BandwidthBytesPerSec,
            MetricKey::MemoryUsageMb,
            MetricKey::CpuUsagePct,
            MetricKey::UptimeSeconds,
        ];
        for key in keys {
            let parsed: MetricKey = key.as_str().parse().expect("parse");
            assert_eq!(parsed, key);
        }
        assert!("load_average".parse::<MetricKey>().is_err());
    }

    #[test]
    fn test_snapshot_serializes_to_flat_object() {
        let snap = sample_snapshot();
        let json = serde_json::to_value(&snap).expect("serialize");
        assert_eq!(json["active_connections"], 7);
        assert_eq!(json["avg_latency_ms"], 85.0);
    }
}
