//! Shared domain types: connection identifiers, severities, statuses.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Opaque connection identifier.
///
/// Supplied by the transport layer when a connection is first tracked and
/// stable for the record's lifetime. The engine never generates these.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Wraps a caller-supplied identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ConnectionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ConnectionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Alert severity levels, ordered least to most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational, no action needed.
    Info,
    /// Something looks off; worth a look during working hours.
    Warning,
    /// Degradation that needs prompt attention.
    Critical,
    /// Service-threatening; page whoever is on call.
    Emergency,
}

impl Severity {
    /// All severities, least to most severe.
    pub const ALL: [Severity; 4] = [
        Severity::Info,
        Severity::Warning,
        Severity::Critical,
        Severity::Emergency,
    ];

    /// Returns the lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
            Self::Emergency => "emergency",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Severity {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(Self::Info),
            "warning" => Ok(Self::Warning),
            "critical" => Ok(Self::Critical),
            "emergency" => Ok(Self::Emergency),
            other => Err(EngineError::validation(format!(
                "unknown severity '{other}'"
            ))),
        }
    }
}

/// Lifecycle status of a tracked connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// Handshake in progress.
    Connecting,
    /// Fully established; counts toward the active total.
    Connected,
    /// Close initiated but not yet complete.
    Disconnecting,
    /// Closed; record remains until explicit cleanup.
    Disconnected,
    /// Failed; record remains for diagnostics until cleanup.
    Error,
}

impl ConnectionStatus {
    /// Returns the lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnecting => "disconnecting",
            Self::Disconnected => "disconnected",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Direction of a message relative to the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageDirection {
    /// Service → client.
    Sent,
    /// Client → service.
    Received,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_display() {
        let id = ConnectionId::new("conn-42");
        assert_eq!(id.to_string(), "conn-42");
        assert_eq!(id.as_str(), "conn-42");
    }

    #[test]
    fn test_connection_id_serde_transparent() {
        let id = ConnectionId::new("c1");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"c1\"");
        let parsed: ConnectionId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Critical);
        assert!(Severity::Critical < Severity::Emergency);
    }

    #[test]
    fn test_severity_roundtrip() {
        for sev in Severity::ALL {
            let parsed: Severity = sev.as_str().parse().expect("parse");
            assert_eq!(parsed, sev);
        }
        assert!("fatal".parse::<Severity>().is_err());
    }

    #[test]
    fn test_status_serde_lowercase() {
        let json = serde_json::to_string(&ConnectionStatus::Disconnecting).expect("serialize");
        assert_eq!(json, "\"disconnecting\"");
    }
}
