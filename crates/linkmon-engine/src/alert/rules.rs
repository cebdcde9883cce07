//! Alert rule predicates.
//!
//! Rules are pure with respect to their input: they look at one snapshot
//! (plus the health report derived from it) and say whether to fire. All
//! firing state, cooldowns included, lives in the rule engine.

use chrono::Duration;

use linkmon_core::config::alerting::{CompareOp, RuleConfig, RuleKind};
use linkmon_core::metrics::{MetricKey, ServiceMetricsSnapshot};
use linkmon_core::types::Severity;
use linkmon_core::EngineResult;

use crate::health::{HealthReport, HealthVerdict};

/// Everything a rule may examine during one evaluation.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub snapshot: &'a ServiceMetricsSnapshot,
    pub health: &'a HealthReport,
}

/// One alert predicate.
///
/// `evaluate` returns the alert message when the predicate holds for this
/// context. A returned error is logged by the engine and treated as the
/// rule not firing; it never disturbs other rules.
pub trait AlertRule: Send + Sync {
    /// Unique name; doubles as the emitted alert's type tag.
    fn name(&self) -> &str;
    /// Severity of the alerts this rule emits.
    fn severity(&self) -> Severity;
    /// Minimum time between consecutive firings.
    fn cooldown(&self) -> Duration;
    /// Tests the predicate against one context.
    fn evaluate(&self, ctx: &RuleContext<'_>) -> EngineResult<Option<String>>;
}

/// Builds the rule implementation a configuration entry describes.
pub fn build_rule(config: &RuleConfig) -> Box<dyn AlertRule> {
    let cooldown = Duration::minutes(config.cooldown_minutes as i64);
    match config.kind {
        RuleKind::Threshold { metric, op, value } => Box::new(ThresholdRule {
            name: config.name.clone(),
            severity: config.severity,
            cooldown,
            metric,
            op,
            value,
            template: config.message.clone(),
        }),
        RuleKind::DropRate {
            max_ratio,
            min_connection_rate,
        } => Box::new(DropRateRule {
            name: config.name.clone(),
            severity: config.severity,
            cooldown,
            max_ratio,
            min_connection_rate,
            template: config.message.clone(),
        }),
        RuleKind::Unhealthy => Box::new(UnhealthyRule {
            name: config.name.clone(),
            severity: config.severity,
            cooldown,
            template: config.message.clone(),
        }),
    }
}

fn render_template(template: &str, value: f64, threshold: f64) -> String {
    template
        .replace("{value}", &format!("{value:.2}"))
        .replace("{threshold}", &format!("{threshold:.2}"))
}

/// Compares one snapshot metric against a fixed value.
struct ThresholdRule {
    name: String,
    severity: Severity,
    cooldown: Duration,
    metric: MetricKey,
    op: CompareOp,
    value: f64,
    template: Option<String>,
}

impl ThresholdRule {
    fn message(&self, observed: f64) -> String {
        match &self.template {
            Some(template) => render_template(template, observed, self.value),
            None => format!(
                "{} is {:.2} ({} {:.2})",
                self.metric, observed, self.op, self.value
            ),
        }
    }
}

impl AlertRule for ThresholdRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn severity(&self) -> Severity {
        self.severity
    }

    fn cooldown(&self) -> Duration {
        self.cooldown
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> EngineResult<Option<String>> {
        let observed = self.metric.extract(ctx.snapshot);
        Ok(self
            .op
            .compare(observed, self.value)
            .then(|| self.message(observed)))
    }
}

/// Watches the disconnection/connection ratio, but only under enough
/// connection churn for the ratio to mean anything.
struct DropRateRule {
    name: String,
    severity: Severity,
    cooldown: Duration,
    max_ratio: f64,
    min_connection_rate: f64,
    template: Option<String>,
}

impl AlertRule for DropRateRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn severity(&self) -> Severity {
        self.severity
    }

    fn cooldown(&self) -> Duration {
        self.cooldown
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> EngineResult<Option<String>> {
        let snapshot = ctx.snapshot;
        // Below the churn floor the ratio is noise (and the division may be
        // by zero).
        if snapshot.connection_rate <= self.min_connection_rate {
            return Ok(None);
        }
        let ratio = snapshot.disconnection_rate / snapshot.connection_rate;
        if ratio <= self.max_ratio {
            return Ok(None);
        }
        let message = match &self.template {
            Some(template) => render_template(template, ratio, self.max_ratio),
            None => format!(
                "disconnect/connect ratio {:.0}% over {:.0}% (connect rate {:.2}/s)",
                ratio * 100.0,
                self.max_ratio * 100.0,
                snapshot.connection_rate
            ),
        };
        Ok(Some(message))
    }
}

/// Fires while the health verdict is `unhealthy`.
struct UnhealthyRule {
    name: String,
    severity: Severity,
    cooldown: Duration,
    template: Option<String>,
}

impl AlertRule for UnhealthyRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn severity(&self) -> Severity {
        self.severity
    }

    fn cooldown(&self) -> Duration {
        self.cooldown
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> EngineResult<Option<String>> {
        if ctx.health.verdict != HealthVerdict::Unhealthy {
            return Ok(None);
        }
        let message = match &self.template {
            Some(template) => template.clone(),
            None => {
                let failing = ctx.health.failing();
                format!(
                    "service unhealthy: {} of {} checks failing ({})",
                    failing.len(),
                    ctx.health.checks.len(),
                    failing.join(", ")
                )
            }
        };
        Ok(Some(message))
    }
}
