//! Rule evaluation with per-rule cooldown tracking.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use linkmon_core::alert::Alert;
use linkmon_core::config::alerting::RuleConfig;
use linkmon_core::{EngineError, EngineResult};

use super::rules::{build_rule, AlertRule, RuleContext};

/// Evaluates the rule set against each snapshot and emits alerts.
///
/// Owns the only mutable alerting state: when each rule last fired. The
/// caller passes an explicit `now` so a whole tick shares one clock reading.
pub struct RuleEngine {
    rules: Vec<Box<dyn AlertRule>>,
    last_fired: HashMap<String, DateTime<Utc>>,
}

impl std::fmt::Debug for RuleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleEngine")
            .field("rules", &self.rules.len())
            .finish()
    }
}

impl RuleEngine {
    /// Builds the engine from configuration. Disabled rules are dropped
    /// here; names must be non-empty and unique.
    pub fn from_config(configs: &[RuleConfig]) -> EngineResult<Self> {
        let mut seen = HashSet::new();
        let mut rules: Vec<Box<dyn AlertRule>> = Vec::new();
        for config in configs {
            if config.name.trim().is_empty() {
                return Err(EngineError::configuration("alert rule with empty name"));
            }
            if !seen.insert(config.name.clone()) {
                return Err(EngineError::configuration(format!(
                    "duplicate alert rule name '{}'",
                    config.name
                )));
            }
            if !config.enabled {
                debug!(rule = %config.name, "alert rule disabled, skipping");
                continue;
            }
            rules.push(build_rule(config));
        }
        Ok(Self::with_rules(rules))
    }

    /// Builds the engine from already-constructed rules.
    pub fn with_rules(rules: Vec<Box<dyn AlertRule>>) -> Self {
        Self {
            rules,
            last_fired: HashMap::new(),
        }
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Runs every rule against the context. Rules inside their cooldown are
    /// skipped without being evaluated; a failing rule is logged and treated
    /// as not firing.
    pub fn evaluate(&mut self, ctx: &RuleContext<'_>, now: DateTime<Utc>) -> Vec<Alert> {
        let mut alerts = Vec::new();
        for rule in &self.rules {
            if let Some(last) = self.last_fired.get(rule.name()) {
                if now.signed_duration_since(*last) < rule.cooldown() {
                    continue;
                }
            }
            match rule.evaluate(ctx) {
                Ok(Some(message)) => {
                    self.last_fired.insert(rule.name().to_string(), now);
                    alerts.push(build_alert(rule.as_ref(), message, now, ctx));
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(rule = rule.name(), error = %err, "rule evaluation failed, treated as not firing");
                }
            }
        }
        alerts
    }
}

fn build_alert(
    rule: &dyn AlertRule,
    message: String,
    now: DateTime<Utc>,
    ctx: &RuleContext<'_>,
) -> Alert {
    let mut metadata = snapshot_fields(ctx);
    metadata.insert("rule".to_string(), json!(rule.name()));
    Alert {
        id: Uuid::new_v4(),
        alert_type: rule.name().to_string(),
        severity: rule.severity(),
        message,
        timestamp: now,
        metadata,
    }
}

fn snapshot_fields(ctx: &RuleContext<'_>) -> Map<String, Value> {
    match serde_json::to_value(ctx.snapshot) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::{HealthEvaluator, HealthReport};
    use chrono::Duration;
    use linkmon_core::config::alerting::{CompareOp, RuleKind};
    use linkmon_core::config::health::HealthConfig;
    use linkmon_core::metrics::{MetricKey, ServiceMetricsSnapshot};
    use linkmon_core::types::Severity;

    fn always_firing_config(name: &str, cooldown_minutes: u64) -> RuleConfig {
        RuleConfig {
            name: name.to_string(),
            enabled: true,
            severity: Severity::Critical,
            cooldown_minutes,
            message: None,
            kind: RuleKind::Threshold {
                metric: MetricKey::MessageRate,
                op: CompareOp::Gte,
                value: 0.0,
            },
        }
    }

    fn context(snapshot: &ServiceMetricsSnapshot) -> HealthReport {
        HealthEvaluator::new(HealthConfig::default()).evaluate(snapshot)
    }

    struct FailingRule;

    impl AlertRule for FailingRule {
        fn name(&self) -> &str {
            "broken-rule"
        }

        fn severity(&self) -> Severity {
            Severity::Info
        }

        fn cooldown(&self) -> Duration {
            Duration::minutes(1)
        }

        fn evaluate(&self, _ctx: &RuleContext<'_>) -> EngineResult<Option<String>> {
            Err(EngineError::internal("synthetic failure"))
        }
    }

    #[test]
    fn test_cooldown_suppresses_refiring() {
        let mut engine =
            RuleEngine::from_config(&[always_firing_config("chatty", 5)]).expect("engine");
        let snapshot = ServiceMetricsSnapshot::default();
        let report = context(&snapshot);
        let ctx = RuleContext {
            snapshot: &snapshot,
            health: &report,
        };

        let t0 = Utc::now();
        assert_eq!(engine.evaluate(&ctx, t0).len(), 1);
        assert_eq!(engine.evaluate(&ctx, t0 + Duration::minutes(4)).len(), 0);
        // At exactly the cooldown the rule may fire again.
        assert_eq!(engine.evaluate(&ctx, t0 + Duration::minutes(5)).len(), 1);
    }

    #[test]
    fn test_failing_rule_does_not_disturb_others() {
        let mut engine = RuleEngine::with_rules(vec![
            Box::new(FailingRule),
            build_rule(&always_firing_config("fine-rule", 5)),
        ]);
        let snapshot = ServiceMetricsSnapshot::default();
        let report = context(&snapshot);
        let ctx = RuleContext {
            snapshot: &snapshot,
            health: &report,
        };

        let alerts = engine.evaluate(&ctx, Utc::now());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, "fine-rule");
    }

    #[test]
    fn test_alert_carries_rule_and_snapshot_metadata() {
        let mut engine =
            RuleEngine::from_config(&[always_firing_config("tagged", 5)]).expect("engine");
        let snapshot = ServiceMetricsSnapshot {
            active_connections: 42,
            ..ServiceMetricsSnapshot::default()
        };
        let report = context(&snapshot);
        let ctx = RuleContext {
            snapshot: &snapshot,
            health: &report,
        };

        let now = Utc::now();
        let alerts = engine.evaluate(&ctx, now);
        let alert = &alerts[0];
        assert_eq!(alert.severity, Severity::Critical);
        assert_eq!(alert.timestamp, now);
        assert_eq!(alert.metadata["rule"], json!("tagged"));
        assert_eq!(alert.metadata["active_connections"], json!(42));
    }

    #[test]
    fn test_disabled_rules_are_dropped_at_build() {
        let mut config = always_firing_config("muted", 5);
        config.enabled = false;
        let engine = RuleEngine::from_config(&[config]).expect("engine");
        assert_eq!(engine.rule_count(), 0);
    }

    #[test]
    fn test_duplicate_rule_names_rejected() {
        let configs = [
            always_firing_config("twin", 5),
            always_firing_config("twin", 10),
        ];
        let err = RuleEngine::from_config(&configs).expect_err("duplicate");
        assert_eq!(err.kind, linkmon_core::error::ErrorKind::Configuration);
    }
}
