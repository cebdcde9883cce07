//! Alert delivery: the sender capability, channel implementations, the
//! fan-out manager, and the bounded delivery history.

pub mod channels;
pub mod history;
pub mod manager;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use linkmon_core::alert::Alert;
use linkmon_core::config::alerting::ChannelKind;
use linkmon_core::types::Severity;
use linkmon_core::EngineResult;

pub use history::{AlertHistory, AlertHistoryEntry, ChannelStats, DeliveryStats};
pub use manager::{DeliveryManager, DeliveryOutcome};

/// What a sender receives for one dispatch: the alert's content plus the
/// resolved channel name. Senders decide how their transport serializes it.
#[derive(Debug, Clone, Serialize)]
pub struct AlertPayload {
    pub channel: String,
    pub alert_id: Uuid,
    pub alert_type: String,
    pub severity: Severity,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub metadata: Map<String, Value>,
    /// True for synthetic wiring-check alerts.
    pub test: bool,
}

impl AlertPayload {
    pub fn new(alert: &Alert, channel: &str) -> Self {
        Self {
            channel: channel.to_string(),
            alert_id: alert.id,
            alert_type: alert.alert_type.clone(),
            severity: alert.severity,
            message: alert.message.clone(),
            timestamp: alert.timestamp,
            metadata: alert.metadata.clone(),
            test: alert.is_test(),
        }
    }
}

/// Delivers alerts over one transport.
///
/// Implementations own their wire format and any transport-level retries.
/// The manager isolates failures per channel and applies the configured
/// per-send timeout around each call.
#[async_trait]
pub trait AlertSender: Send + Sync {
    /// The sender family, for logs.
    fn kind(&self) -> ChannelKind;

    /// Delivers one alert.
    async fn send(&self, payload: &AlertPayload) -> EngineResult<()>;
}

// Lets unit tests call `expect_err` on results holding boxed senders.
#[cfg(test)]
impl std::fmt::Debug for dyn AlertSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn AlertSender")
    }
}
