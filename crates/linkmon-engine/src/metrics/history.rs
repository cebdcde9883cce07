//! Time-bounded retention of aggregated snapshots.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::Duration;

use linkmon_core::metrics::ServiceMetricsSnapshot;

/// Ring of recent snapshots, evicted by age rather than count.
///
/// Entries are appended in tick order and trimmed from the front once they
/// fall out of the retention window, so memory use is bounded by the window
/// length times the tick rate.
#[derive(Debug)]
pub struct SnapshotHistory {
    retention: Duration,
    entries: Mutex<VecDeque<Arc<ServiceMetricsSnapshot>>>,
}

impl SnapshotHistory {
    pub fn new(retention_hours: u64) -> Self {
        Self {
            retention: Duration::hours(retention_hours as i64),
            entries: Mutex::new(VecDeque::new()),
        }
    }

    /// Appends a snapshot and evicts everything older than the retention
    /// window, measured from the new snapshot's timestamp.
    pub fn push(&self, snapshot: Arc<ServiceMetricsSnapshot>) {
        let cutoff = snapshot.timestamp - self.retention;
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.push_back(snapshot);
        while entries
            .front()
            .is_some_and(|oldest| oldest.timestamp < cutoff)
        {
            entries.pop_front();
        }
    }

    /// The most recent `limit` snapshots, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<Arc<ServiceMetricsSnapshot>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let skip = entries.len().saturating_sub(limit);
        entries.iter().skip(skip).cloned().collect()
    }

    /// The newest retained snapshot.
    pub fn latest(&self) -> Option<Arc<ServiceMetricsSnapshot>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.back().cloned()
    }

    pub fn len(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
