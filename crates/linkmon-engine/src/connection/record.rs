//! Mutable state tracked for a single connection.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;

use linkmon_core::types::{ConnectionId, ConnectionStatus, MessageDirection};

/// Most recent latency samples retained per connection. Older samples are
/// discarded in arrival order once the window is full.
pub const LATENCY_SAMPLE_CAPACITY: usize = 100;

/// Live accounting for one tracked connection. Owned by the registry and
/// only ever mutated while its map entry is locked.
#[derive(Debug)]
pub struct ConnectionRecord {
    pub id: ConnectionId,
    pub user_id: Option<String>,
    pub endpoint: String,
    pub status: ConnectionStatus,
    pub connected_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub messages_sent: u64,
    pub messages_received: u64,
    pub bytes_transferred: u64,
    pub errors: u64,
    pub reconnect_count: u64,
    latency_samples: VecDeque<f64>,
}

impl ConnectionRecord {
    pub fn new(id: ConnectionId, user_id: Option<String>, endpoint: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id,
            endpoint: endpoint.into(),
            status: ConnectionStatus::Connecting,
            connected_at: now,
            last_activity: now,
            messages_sent: 0,
            messages_received: 0,
            bytes_transferred: 0,
            errors: 0,
            reconnect_count: 0,
            latency_samples: VecDeque::with_capacity(LATENCY_SAMPLE_CAPACITY),
        }
    }

    /// Accounts for one message in the given direction and refreshes the
    /// activity timestamp. Non-finite latency samples are dropped.
    pub fn record_message(
        &mut self,
        direction: MessageDirection,
        size_bytes: u64,
        latency_ms: Option<f64>,
    ) {
        match direction {
            MessageDirection::Sent => self.messages_sent += 1,
            MessageDirection::Received => self.messages_received += 1,
        }
        self.bytes_transferred += size_bytes;
        if let Some(sample) = latency_ms {
            if sample.is_finite() {
                self.push_latency(sample);
            }
        }
        self.last_activity = Utc::now();
    }

    pub fn record_error(&mut self) {
        self.errors += 1;
    }

    pub fn record_reconnect(&mut self) {
        self.reconnect_count += 1;
    }

    pub fn total_messages(&self) -> u64 {
        self.messages_sent + self.messages_received
    }

    pub fn latency_samples(&self) -> &VecDeque<f64> {
        &self.latency_samples
    }

    fn push_latency(&mut self, sample: f64) {
        if self.latency_samples.len() == LATENCY_SAMPLE_CAPACITY {
            self.latency_samples.pop_front();
        }
        self.latency_samples.push_back(sample);
    }

    /// Point-in-time copy handed to readers. Taken while the entry lock is
    /// held, so a summary never reflects a half-applied mutation.
    pub fn summary(&self) -> ConnectionSummary {
        ConnectionSummary {
            id: self.id.clone(),
            user_id: self.user_id.clone(),
            endpoint: self.endpoint.clone(),
            status: self.status,
            connected_at: self.connected_at,
            last_activity: self.last_activity,
            messages_sent: self.messages_sent,
            messages_received: self.messages_received,
            bytes_transferred: self.bytes_transferred,
            errors: self.errors,
            reconnect_count: self.reconnect_count,
            latency_samples: self.latency_samples.iter().copied().collect(),
        }
    }
}

/// Immutable copy of a [`ConnectionRecord`] as of one instant.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionSummary {
    pub id: ConnectionId,
    pub user_id: Option<String>,
    pub endpoint: String,
    pub status: ConnectionStatus,
    pub connected_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub messages_sent: u64,
    pub messages_received: u64,
    pub bytes_transferred: u64,
    pub errors: u64,
    pub reconnect_count: u64,
    pub latency_samples: Vec<f64>,
}

impl ConnectionSummary {
    pub fn total_messages(&self) -> u64 {
        self.messages_sent + self.messages_received
    }
}
