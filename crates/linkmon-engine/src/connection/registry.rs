//! Connection registry: the authoritative map of tracked connections.
//!
//! The registry is shared between the transport event path (mutations) and
//! the aggregation tick (scans). Per-connection state lives in a sharded
//! [`DashMap`], so mutations on different connections never contend. The
//! active count is kept in an atomic that is only ever adjusted while the
//! affected entry's lock is held, which keeps the counter and the record it
//! describes in step.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use linkmon_core::alert::Alert;
use linkmon_core::config::telemetry::TelemetryConfig;
use linkmon_core::types::{ConnectionId, ConnectionStatus, MessageDirection, Severity};
use linkmon_core::{EngineError, EngineResult};

use super::record::{ConnectionRecord, ConnectionSummary};

/// Alert type for a single message whose latency crossed the spike threshold.
pub const ALERT_TYPE_LATENCY_SPIKE: &str = "connection-latency-spike";
/// Alert type for a connection whose error count reached the burst threshold.
pub const ALERT_TYPE_ERROR_BURST: &str = "connection-error-burst";

/// Tracks every live (and recently closed) connection.
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, ConnectionRecord>,
    active: AtomicU64,
    anomaly_tx: mpsc::Sender<Alert>,
    latency_spike_ms: f64,
    error_threshold: u64,
}

impl std::fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("connections", &self.connections.len())
            .field("active", &self.active.load(Ordering::Acquire))
            .finish()
    }
}

impl ConnectionRegistry {
    /// Creates an empty registry. Per-connection anomaly alerts (latency
    /// spikes, error bursts) are pushed onto `anomaly_tx` without blocking;
    /// when the queue is full they are dropped and logged.
    pub fn new(config: &TelemetryConfig, anomaly_tx: mpsc::Sender<Alert>) -> Self {
        Self {
            connections: DashMap::new(),
            active: AtomicU64::new(0),
            anomaly_tx,
            latency_spike_ms: config.latency_spike_ms,
            error_threshold: config.connection_error_threshold,
        }
    }

    /// Starts tracking a connection in `connecting` status.
    ///
    /// Fails if the id is already tracked; the caller decides whether that
    /// means a transport bug or an id collision.
    pub fn track(
        &self,
        id: ConnectionId,
        user_id: Option<String>,
        endpoint: impl Into<String>,
    ) -> EngineResult<()> {
        match self.connections.entry(id.clone()) {
            Entry::Occupied(_) => Err(EngineError::duplicate_connection(format!(
                "connection '{id}' is already tracked"
            ))),
            Entry::Vacant(slot) => {
                slot.insert(ConnectionRecord::new(id.clone(), user_id, endpoint));
                debug!(conn_id = %id, total = self.connections.len(), "connection tracked");
                Ok(())
            }
        }
    }

    /// Moves a connection to a new lifecycle status, keeping the active
    /// counter in step with transitions into and out of `connected`.
    ///
    /// Unknown ids are ignored: close events for already-removed connections
    /// are routine during reconnect storms.
    pub fn set_status(&self, id: &ConnectionId, status: ConnectionStatus) {
        let Some(mut record) = self.connections.get_mut(id) else {
            debug!(conn_id = %id, status = %status, "status change for unknown connection ignored");
            return;
        };
        let was_connected = record.status == ConnectionStatus::Connected;
        let now_connected = status == ConnectionStatus::Connected;
        record.status = status;
        record.last_activity = Utc::now();
        // Adjusted while the entry lock is held so the counter never
        // disagrees with the record a concurrent scan just copied.
        if now_connected && !was_connected {
            self.active.fetch_add(1, Ordering::AcqRel);
        } else if was_connected && !now_connected {
            self.active.fetch_sub(1, Ordering::AcqRel);
        }
    }

    /// Accounts for one message on a connection. A latency sample above the
    /// spike threshold raises an inline anomaly alert.
    pub fn record_message(
        &self,
        id: &ConnectionId,
        direction: MessageDirection,
        size_bytes: u64,
        latency_ms: Option<f64>,
    ) {
        let anomaly = {
            let Some(mut record) = self.connections.get_mut(id) else {
                debug!(conn_id = %id, "message for unknown connection ignored");
                return;
            };
            record.record_message(direction, size_bytes, latency_ms);
            match latency_ms {
                Some(ms) if ms.is_finite() && ms > self.latency_spike_ms => Some(
                    Alert::new(
                        ALERT_TYPE_LATENCY_SPIKE,
                        Severity::Warning,
                        format!(
                            "connection {id} saw {ms:.0}ms latency (threshold {:.0}ms)",
                            self.latency_spike_ms
                        ),
                    )
                    .with_metadata("connection_id", json!(id.as_str()))
                    .with_metadata("endpoint", json!(record.endpoint))
                    .with_metadata("latency_ms", json!(ms)),
                ),
                _ => None,
            }
        };
        if let Some(alert) = anomaly {
            self.raise_anomaly(alert);
        }
    }

    /// Increments a connection's error count. Reaching the burst threshold
    /// raises an inline anomaly alert, exactly once per connection.
    pub fn record_error(&self, id: &ConnectionId, message: &str, error_kind: &str) {
        let anomaly = {
            let Some(mut record) = self.connections.get_mut(id) else {
                debug!(conn_id = %id, error_kind, "error for unknown connection ignored");
                return;
            };
            record.record_error();
            if record.errors == self.error_threshold {
                Some(
                    Alert::new(
                        ALERT_TYPE_ERROR_BURST,
                        Severity::Warning,
                        format!(
                            "connection {id} accumulated {} errors (last: {message})",
                            record.errors
                        ),
                    )
                    .with_metadata("connection_id", json!(id.as_str()))
                    .with_metadata("endpoint", json!(record.endpoint))
                    .with_metadata("errors", json!(record.errors))
                    .with_metadata("error_kind", json!(error_kind)),
                )
            } else {
                None
            }
        };
        if let Some(alert) = anomaly {
            self.raise_anomaly(alert);
        }
    }

    /// Increments a connection's reconnect count.
    pub fn record_reconnect(&self, id: &ConnectionId) {
        let Some(mut record) = self.connections.get_mut(id) else {
            debug!(conn_id = %id, "reconnect for unknown connection ignored");
            return;
        };
        record.record_reconnect();
    }

    /// Removes a connection's record. A still-connected record is counted
    /// out of the active total under its entry lock before it goes away.
    pub fn remove(&self, id: &ConnectionId) {
        let removed = self.connections.remove_if(id, |_, record| {
            if record.status == ConnectionStatus::Connected {
                self.active.fetch_sub(1, Ordering::AcqRel);
            }
            true
        });
        match removed {
            Some(_) => debug!(conn_id = %id, total = self.connections.len(), "connection removed"),
            None => debug!(conn_id = %id, "removal of unknown connection ignored"),
        }
    }

    /// Copies every record as of now. Each copy is taken under its entry
    /// lock, so no summary reflects a half-applied mutation.
    pub fn snapshot_all(&self) -> Vec<ConnectionSummary> {
        self.connections
            .iter()
            .map(|entry| entry.value().summary())
            .collect()
    }

    /// Copies one record, if tracked.
    pub fn get(&self, id: &ConnectionId) -> Option<ConnectionSummary> {
        self.connections.get(id).map(|record| record.summary())
    }

    /// Connections currently in `connected` status, from the maintained
    /// counter (no scan).
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::Acquire) as usize
    }

    /// All tracked connections, any status.
    pub fn total_connections(&self) -> usize {
        self.connections.len()
    }

    fn raise_anomaly(&self, alert: Alert) {
        if let Err(err) = self.anomaly_tx.try_send(alert) {
            warn!(error = %err, "anomaly queue full or closed, alert dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_registry() -> (ConnectionRegistry, mpsc::Receiver<Alert>) {
        let (tx, rx) = mpsc::channel(16);
        (ConnectionRegistry::new(&TelemetryConfig::default(), tx), rx)
    }

    fn track(registry: &ConnectionRegistry, id: &str) {
        registry
            .track(ConnectionId::from(id), None, "wss://edge.example.net")
            .expect("track");
    }

    #[test]
    fn test_track_rejects_duplicate_id() {
        let (registry, _rx) = make_registry();
        track(&registry, "c1");
        let err = registry
            .track(ConnectionId::from("c1"), None, "wss://other.example.net")
            .expect_err("duplicate must fail");
        assert_eq!(err.kind, linkmon_core::error::ErrorKind::DuplicateConnection);
        assert_eq!(registry.total_connections(), 1);
    }

    #[test]
    fn test_active_counter_follows_status_transitions() {
        let (registry, _rx) = make_registry();
        let id = ConnectionId::from("c1");
        track(&registry, "c1");
        assert_eq!(registry.active_connections(), 0);

        registry.set_status(&id, ConnectionStatus::Connected);
        assert_eq!(registry.active_connections(), 1);

        // Same-status transition must not double count.
        registry.set_status(&id, ConnectionStatus::Connected);
        assert_eq!(registry.active_connections(), 1);

        registry.set_status(&id, ConnectionStatus::Disconnected);
        assert_eq!(registry.active_connections(), 0);

        registry.set_status(&id, ConnectionStatus::Connected);
        registry.remove(&id);
        assert_eq!(registry.active_connections(), 0);
        assert_eq!(registry.total_connections(), 0);
    }

    #[test]
    fn test_mutations_on_unknown_ids_are_ignored() {
        let (registry, _rx) = make_registry();
        let ghost = ConnectionId::from("ghost");
        registry.set_status(&ghost, ConnectionStatus::Connected);
        registry.record_message(&ghost, MessageDirection::Sent, 64, Some(10.0));
        registry.record_error(&ghost, "boom", "io");
        registry.record_reconnect(&ghost);
        registry.remove(&ghost);
        assert_eq!(registry.total_connections(), 0);
        assert_eq!(registry.active_connections(), 0);
    }

    #[test]
    fn test_snapshot_is_a_detached_copy() {
        let (registry, _rx) = make_registry();
        let id = ConnectionId::from("c1");
        track(&registry, "c1");
        registry.record_message(&id, MessageDirection::Sent, 100, Some(25.0));

        let snapshot = registry.snapshot_all();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].messages_sent, 1);

        registry.record_message(&id, MessageDirection::Sent, 100, Some(30.0));
        assert_eq!(snapshot[0].messages_sent, 1);
        assert_eq!(registry.get(&id).map(|s| s.messages_sent), Some(2));
    }

    #[test]
    fn test_latency_spike_raises_anomaly_alert() {
        let (registry, mut rx) = make_registry();
        let id = ConnectionId::from("c1");
        track(&registry, "c1");

        registry.record_message(&id, MessageDirection::Received, 64, Some(100.0));
        assert!(rx.try_recv().is_err());

        registry.record_message(&id, MessageDirection::Received, 64, Some(6000.0));
        let alert = rx.try_recv().expect("spike alert");
        assert_eq!(alert.alert_type, ALERT_TYPE_LATENCY_SPIKE);
        assert_eq!(alert.severity, Severity::Warning);
        assert_eq!(alert.metadata["connection_id"], json!("c1"));
    }

    #[test]
    fn test_error_burst_fires_once_at_threshold() {
        let (tx, mut rx) = mpsc::channel(16);
        let config = TelemetryConfig {
            connection_error_threshold: 3,
            ..TelemetryConfig::default()
        };
        let registry = ConnectionRegistry::new(&config, tx);
        let id = ConnectionId::from("c1");
        registry
            .track(id.clone(), None, "wss://edge.example.net")
            .expect("track");

        for _ in 0..2 {
            registry.record_error(&id, "read timeout", "io");
        }
        assert!(rx.try_recv().is_err());

        registry.record_error(&id, "read timeout", "io");
        let alert = rx.try_recv().expect("burst alert");
        assert_eq!(alert.alert_type, ALERT_TYPE_ERROR_BURST);
        assert_eq!(alert.metadata["errors"], json!(3));

        // Past the threshold no further alerts fire for this connection.
        registry.record_error(&id, "read timeout", "io");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_full_anomaly_queue_drops_instead_of_blocking() {
        let (tx, _rx) = mpsc::channel(1);
        let registry = ConnectionRegistry::new(&TelemetryConfig::default(), tx);
        let id = ConnectionId::from("c1");
        registry
            .track(id.clone(), None, "wss://edge.example.net")
            .expect("track");

        // Queue capacity is 1; the second spike is dropped silently.
        registry.record_message(&id, MessageDirection::Sent, 1, Some(9000.0));
        registry.record_message(&id, MessageDirection::Sent, 1, Some(9000.0));
        assert_eq!(registry.get(&id).map(|s| s.total_messages()), Some(2));
    }
}
