//! Bounded delivery history and the statistics replayed from it.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::Serialize;

use linkmon_core::alert::Alert;
use linkmon_core::types::Severity;

/// Maximum retained delivery entries; the oldest is evicted beyond this.
pub const HISTORY_CAPACITY: usize = 1000;

/// One dispatched alert: which channels were tried and whether any took it.
#[derive(Debug, Clone, Serialize)]
pub struct AlertHistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub alert: Alert,
    pub channels_attempted: Vec<String>,
    pub overall_success: bool,
}

/// Append-only ring of dispatch outcomes, one entry per alert.
///
/// Not synchronized; the delivery manager owns it behind its own lock.
#[derive(Debug, Default)]
pub struct AlertHistory {
    entries: VecDeque<AlertHistoryEntry>,
}

impl AlertHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: AlertHistoryEntry) {
        if self.entries.len() == HISTORY_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// The most recent entries in chronological order. `None` returns the
    /// whole retained history.
    pub fn recent(&self, limit: Option<usize>) -> Vec<AlertHistoryEntry> {
        let take = limit.unwrap_or(self.entries.len()).min(self.entries.len());
        let skip = self.entries.len() - take;
        self.entries.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replays the retained entries into aggregate statistics. Per-channel
    /// counts attribute each entry's overall outcome to every channel it
    /// attempted.
    pub fn stats(&self) -> DeliveryStats {
        let mut by_type: HashMap<String, u64> = HashMap::new();
        let mut by_severity: HashMap<Severity, u64> = HashMap::new();
        let mut channels: HashMap<String, ChannelStats> = HashMap::new();
        let mut succeeded = 0usize;

        for entry in &self.entries {
            *by_type.entry(entry.alert.alert_type.clone()).or_default() += 1;
            *by_severity.entry(entry.alert.severity).or_default() += 1;
            if entry.overall_success {
                succeeded += 1;
            }
            for name in &entry.channels_attempted {
                let stats = channels.entry(name.clone()).or_default();
                if entry.overall_success {
                    stats.sent += 1;
                } else {
                    stats.failed += 1;
                }
            }
        }

        let total = self.entries.len();
        DeliveryStats {
            total_alerts: total,
            success_rate: if total == 0 {
                0.0
            } else {
                succeeded as f64 / total as f64
            },
            by_type,
            by_severity,
            channels,
        }
    }
}

/// Sent/failed tallies for one channel.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ChannelStats {
    pub sent: u64,
    pub failed: u64,
}

/// Aggregate view over the delivery history.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryStats {
    pub total_alerts: usize,
    /// Entries where at least one channel succeeded, over all entries.
    pub success_rate: f64,
    pub by_type: HashMap<String, u64>,
    pub by_severity: HashMap<Severity, u64>,
    pub channels: HashMap<String, ChannelStats>,
}
