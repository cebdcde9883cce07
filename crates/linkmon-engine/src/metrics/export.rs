//! Prometheus exposition of the latest snapshot.

use prometheus::{Encoder, Gauge, IntGauge, Registry, TextEncoder};

use linkmon_core::error::ErrorKind;
use linkmon_core::metrics::ServiceMetricsSnapshot;
use linkmon_core::{EngineError, EngineResult};

/// Mirrors each snapshot into a Prometheus registry for the `/metrics`
/// endpoint. Gauges hold the values of the most recent tick.
#[derive(Debug)]
pub struct TelemetryExporter {
    registry: Registry,
    connections_tracked: IntGauge,
    connections_active: IntGauge,
    connection_rate: Gauge,
    disconnection_rate: Gauge,
    message_rate: Gauge,
    error_rate: Gauge,
    avg_latency_ms: Gauge,
    p95_latency_ms: Gauge,
    bandwidth_bytes_per_sec: Gauge,
    memory_usage_mb: Gauge,
    cpu_usage_pct: Gauge,
    uptime_seconds: IntGauge,
}

impl TelemetryExporter {
    pub fn new() -> EngineResult<Self> {
        let registry = Registry::new_custom(Some("linkmon".to_string()), None)
            .map_err(|e| prom_error("failed to create metrics registry", e))?;
        Ok(Self {
            connections_tracked: int_gauge(
                &registry,
                "connections_tracked",
                "Connections currently tracked, any status",
            )?,
            connections_active: int_gauge(
                &registry,
                "connections_active",
                "Connections currently in connected status",
            )?,
            connection_rate: gauge(
                &registry,
                "connection_rate",
                "New connections per second over the rate window",
            )?,
            disconnection_rate: gauge(
                &registry,
                "disconnection_rate",
                "Disconnections per second over the rate window",
            )?,
            message_rate: gauge(&registry, "message_rate", "Messages per second")?,
            error_rate: gauge(&registry, "error_rate", "Errors per minute")?,
            avg_latency_ms: gauge(
                &registry,
                "avg_latency_ms",
                "Mean round-trip latency in milliseconds",
            )?,
            p95_latency_ms: gauge(
                &registry,
                "p95_latency_ms",
                "95th percentile round-trip latency in milliseconds",
            )?,
            bandwidth_bytes_per_sec: gauge(
                &registry,
                "bandwidth_bytes_per_sec",
                "Payload bytes per second",
            )?,
            memory_usage_mb: gauge(
                &registry,
                "memory_usage_mb",
                "Estimated memory footprint in megabytes",
            )?,
            cpu_usage_pct: gauge(
                &registry,
                "cpu_usage_pct",
                "Estimated CPU utilization in percent",
            )?,
            uptime_seconds: int_gauge(&registry, "uptime_seconds", "Seconds since engine start")?,
            registry,
        })
    }

    /// Copies one snapshot's values into the gauges.
    pub fn observe(&self, snapshot: &ServiceMetricsSnapshot) {
        self.connections_tracked
            .set(snapshot.total_connections as i64);
        self.connections_active
            .set(snapshot.active_connections as i64);
        self.connection_rate.set(snapshot.connection_rate);
        self.disconnection_rate.set(snapshot.disconnection_rate);
        self.message_rate.set(snapshot.message_rate);
        self.error_rate.set(snapshot.error_rate);
        self.avg_latency_ms.set(snapshot.avg_latency_ms);
        self.p95_latency_ms.set(snapshot.p95_latency_ms);
        self.bandwidth_bytes_per_sec
            .set(snapshot.bandwidth_bytes_per_sec);
        self.memory_usage_mb.set(snapshot.memory_usage_mb);
        self.cpu_usage_pct.set(snapshot.cpu_usage_pct);
        self.uptime_seconds.set(snapshot.uptime_seconds as i64);
    }

    /// Renders the registry in the Prometheus text format.
    pub fn render(&self) -> EngineResult<String> {
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&families, &mut buffer)
            .map_err(|e| prom_error("failed to encode metrics", e))?;
        String::from_utf8(buffer)
            .map_err(|e| EngineError::with_source(ErrorKind::Internal, "metrics were not UTF-8", e))
    }
}

fn gauge(registry: &Registry, name: &str, help: &str) -> EngineResult<Gauge> {
    let gauge =
        Gauge::new(name, help).map_err(|e| prom_error("failed to create metrics gauge", e))?;
    registry
        .register(Box::new(gauge.clone()))
        .map_err(|e| prom_error("failed to register metrics gauge", e))?;
    Ok(gauge)
}

fn int_gauge(registry: &Registry, name: &str, help: &str) -> EngineResult<IntGauge> {
    let gauge =
        IntGauge::new(name, help).map_err(|e| prom_error("failed to create metrics gauge", e))?;
    registry
        .register(Box::new(gauge.clone()))
        .map_err(|e| prom_error("failed to register metrics gauge", e))?;
    Ok(gauge)
}

fn prom_error(message: &str, err: prometheus::Error) -> EngineError {
    EngineError::with_source(ErrorKind::Internal, format!("{message}: {err}"), err)
}
