//! Health evaluation over aggregated snapshots.
//!
//! Stateless: every verdict is a pure function of one snapshot and the
//! configured thresholds, so two evaluations of the same snapshot always
//! agree.

use serde::Serialize;

use linkmon_core::config::health::HealthConfig;
use linkmon_core::metrics::ServiceMetricsSnapshot;

/// Overall service verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthVerdict {
    /// Every check passed.
    Healthy,
    /// One or two checks failed.
    Degraded,
    /// Three or more checks failed.
    Unhealthy,
}

impl HealthVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Unhealthy => "unhealthy",
        }
    }
}

impl std::fmt::Display for HealthVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One threshold comparison.
#[derive(Debug, Clone, Serialize)]
pub struct HealthCheck {
    pub name: &'static str,
    pub passed: bool,
    pub value: f64,
    pub threshold: f64,
    pub message: String,
}

/// Verdict plus the checks behind it.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub verdict: HealthVerdict,
    pub checks: Vec<HealthCheck>,
}

impl HealthReport {
    /// Names of the checks that failed.
    pub fn failing(&self) -> Vec<&'static str> {
        self.checks
            .iter()
            .filter(|c| !c.passed)
            .map(|c| c.name)
            .collect()
    }
}

/// Runs the four threshold checks and derives the verdict.
#[derive(Debug, Clone)]
pub struct HealthEvaluator {
    thresholds: HealthConfig,
}

impl HealthEvaluator {
    pub fn new(thresholds: HealthConfig) -> Self {
        Self { thresholds }
    }

    pub fn evaluate(&self, snapshot: &ServiceMetricsSnapshot) -> HealthReport {
        let checks = vec![
            check(
                "connections",
                snapshot.active_connections as f64,
                self.thresholds.max_connections as f64,
                "active connections",
            ),
            check(
                "errors",
                snapshot.error_rate,
                self.thresholds.error_rate_per_min,
                "errors per minute",
            ),
            check(
                "latency",
                snapshot.avg_latency_ms,
                self.thresholds.latency_ms,
                "average latency ms",
            ),
            check(
                "memory",
                snapshot.memory_usage_mb,
                self.thresholds.memory_mb,
                "estimated memory mb",
            ),
        ];
        let failed = checks.iter().filter(|c| !c.passed).count();
        let verdict = match failed {
            0 => HealthVerdict::Healthy,
            1 | 2 => HealthVerdict::Degraded,
            _ => HealthVerdict::Unhealthy,
        };
        HealthReport { verdict, checks }
    }
}

fn check(name: &'static str, value: f64, threshold: f64, what: &str) -> HealthCheck {
    let passed = value <= threshold;
    let message = if passed {
        format!("{what} {value:.2} within limit {threshold:.2}")
    } else {
        format!("{what} {value:.2} over limit {threshold:.2}")
    };
    HealthCheck {
        name,
        passed,
        value,
        threshold,
        message,
    }
}
