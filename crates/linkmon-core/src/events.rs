//! Transport lifecycle events consumed by the engine.
//!
//! The connection transport (out of scope here) emits these as connections
//! come and go; the engine maps them onto registry operations. Everything
//! carries the connection id the transport assigned at open.

use serde::{Deserialize, Serialize};

use crate::types::{ConnectionId, ConnectionStatus, MessageDirection};

/// An event emitted by the transport layer for one connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransportEvent {
    /// A new connection was opened and should be tracked.
    Opened {
        /// The transport-assigned connection id.
        id: ConnectionId,
        /// Owning user, if authenticated.
        user_id: Option<String>,
        /// Logical route/topic the connection is bound to.
        endpoint: String,
    },
    /// The connection moved to a new lifecycle status.
    StatusChanged {
        /// The connection id.
        id: ConnectionId,
        /// The new status.
        status: ConnectionStatus,
    },
    /// A message crossed the connection.
    Message {
        /// The connection id.
        id: ConnectionId,
        /// Direction relative to the service.
        direction: MessageDirection,
        /// Payload size in bytes.
        size_bytes: u64,
        /// Round-trip latency for this message, when the transport measured one.
        latency_ms: Option<f64>,
    },
    /// The transport observed an error on the connection.
    Error {
        /// The connection id.
        id: ConnectionId,
        /// Human-readable error text.
        message: String,
        /// Coarse error category from the transport.
        error_kind: String,
    },
    /// The connection re-established itself after a drop.
    Reconnected {
        /// The connection id.
        id: ConnectionId,
    },
    /// The connection is gone and its record should be cleaned up.
    Closed {
        /// The connection id.
        id: ConnectionId,
    },
}

impl TransportEvent {
    /// The connection id this event concerns.
    pub fn connection_id(&self) -> &ConnectionId {
        match self {
            Self::Opened { id, .. }
            | Self::StatusChanged { id, .. }
            | Self::Message { id, .. }
            | Self::Error { id, .. }
            | Self::Reconnected { id }
            | Self::Closed { id } => id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_tagged_serialization() {
        let event = TransportEvent::Message {
            id: ConnectionId::new("c1"),
            direction: MessageDirection::Sent,
            size_bytes: 512,
            latency_ms: Some(12.5),
        };
        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json["type"], "message");
        assert_eq!(json["direction"], "sent");
        assert_eq!(json["size_bytes"], 512);
    }

    #[test]
    fn test_connection_id_accessor() {
        let event = TransportEvent::Closed {
            id: ConnectionId::new("gone"),
        };
        assert_eq!(event.connection_id().as_str(), "gone");
    }
}
