//! The alert value emitted by rules and routed to channels.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::types::Severity;

/// Metadata key marking synthetic alerts raised by the test operation.
pub const TEST_METADATA_KEY: &str = "test";

/// One alert, immutable once built.
///
/// Alerts are ephemeral: they live in the delivery history ring and nowhere
/// else. `alert_type` is a free-form category tag (the rule name for
/// rule-emitted alerts).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// Unique id for correlation in logs and channel payloads.
    pub id: Uuid,
    /// Free-form category tag.
    pub alert_type: String,
    /// Severity assigned by whoever raised the alert.
    pub severity: Severity,
    /// Human-readable description.
    pub message: String,
    /// When the alert was raised.
    pub timestamp: DateTime<Utc>,
    /// Context bag: rule name, snapshot fields, connection id, etc.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Alert {
    /// Builds an alert stamped with the current time.
    pub fn new(alert_type: impl Into<String>, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            alert_type: alert_type.into(),
            severity,
            message: message.into(),
            timestamp: Utc::now(),
            metadata: Map::new(),
        }
    }

    /// Adds one metadata entry, builder-style.
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Replaces the whole metadata bag, builder-style.
    pub fn with_metadata_map(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// True for synthetic alerts raised by the manual test operation.
    pub fn is_test(&self) -> bool {
        self.metadata
            .get(TEST_METADATA_KEY)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_alert_builder() {
        let alert = Alert::new("high-latency", Severity::Warning, "latency at 2500ms")
            .with_metadata("rule", json!("high-latency"))
            .with_metadata("avg_latency_ms", json!(2500.0));
        assert_eq!(alert.alert_type, "high-latency");
        assert_eq!(alert.severity, Severity::Warning);
        assert_eq!(alert.metadata["avg_latency_ms"], json!(2500.0));
        assert!(!alert.is_test());
    }

    #[test]
    fn test_is_test_flag() {
        let alert = Alert::new("test-alert", Severity::Info, "wiring check")
            .with_metadata(TEST_METADATA_KEY, json!(true));
        assert!(alert.is_test());
    }
}
