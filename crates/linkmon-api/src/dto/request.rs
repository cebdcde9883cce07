//! Request DTOs.

use serde::{Deserialize, Serialize};

use linkmon_core::types::Severity;

/// Body of `POST /api/alerts/test`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestAlertRequest {
    /// Severity for the synthetic alert.
    pub severity: Severity,
    /// Restrict the test to one configured channel by name.
    #[serde(default)]
    pub channel: Option<String>,
}

/// Query parameters for list endpoints that take a `limit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitQuery {
    /// Maximum number of entries to return.
    #[serde(default)]
    pub limit: Option<usize>,
}
