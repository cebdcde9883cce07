//! Alert rule, channel, and delivery configuration.
//!
//! Rules and channels are data: operators add or re-tune them in TOML
//! without touching engine code. The reference rule set ships as the
//! coded default and applies whenever the file defines no `[[rules]]`.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::metrics::MetricKey;
use crate::types::Severity;

/// Alerting and delivery configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertingConfig {
    /// Per-channel send timeout in seconds; a send still in flight after
    /// this long is treated as a delivery failure.
    #[serde(default = "default_send_timeout")]
    pub send_timeout_seconds: u64,
    /// Alert rules evaluated against each snapshot.
    #[serde(default = "default_rules")]
    pub rules: Vec<RuleConfig>,
    /// Output channels alerts are routed to.
    #[serde(default)]
    pub channels: Vec<ChannelConfig>,
}

impl Default for AlertingConfig {
    fn default() -> Self {
        Self {
            send_timeout_seconds: default_send_timeout(),
            rules: default_rules(),
            channels: Vec::new(),
        }
    }
}

/// One named alert rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Unique rule name; doubles as the emitted alert's type tag.
    pub name: String,
    /// Disabled rules are kept but never evaluated.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Severity of alerts this rule emits.
    pub severity: Severity,
    /// Minimum minutes between consecutive firings.
    pub cooldown_minutes: u64,
    /// Optional message template; `{value}` and `{threshold}` are
    /// substituted. Without one the rule formats a builtin message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// What the rule actually tests.
    #[serde(flatten)]
    pub kind: RuleKind,
}

/// The predicate family a rule belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleKind {
    /// Compare one snapshot metric against a fixed value.
    Threshold {
        /// Which snapshot field to test.
        metric: MetricKey,
        /// Comparison operator.
        op: CompareOp,
        /// Threshold value.
        value: f64,
    },
    /// Disconnection/connection ratio guard, active only under load.
    DropRate {
        /// Maximum healthy disconnection/connection ratio (0.2 = 20%).
        max_ratio: f64,
        /// Ratio is only meaningful above this connection rate (per second).
        min_connection_rate: f64,
    },
    /// Fires when the health evaluator's verdict is `unhealthy`.
    Unhealthy,
}

/// Comparison operator for threshold rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    /// Strictly greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Strictly less than.
    Lt,
    /// Less than or equal.
    Lte,
}

impl CompareOp {
    /// Applies the comparison with the metric on the left.
    pub fn compare(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            Self::Gt => lhs > rhs,
            Self::Gte => lhs >= rhs,
            Self::Lt => lhs < rhs,
            Self::Lte => lhs <= rhs,
        }
    }

    /// Returns the operator's symbolic form for messages.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// One named output channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Unique channel name.
    pub name: String,
    /// Which sender implementation this channel uses.
    pub kind: ChannelKind,
    /// Disabled channels are never eligible.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Severities this channel accepts.
    #[serde(default = "default_severity_filter")]
    pub severity_filter: Vec<Severity>,
    /// Minimum minutes between sends on this channel; 0 disables the limit.
    #[serde(default)]
    pub rate_limit_minutes: u64,
    /// Sender-specific settings (webhook URL, SMTP host, routing key, ...).
    /// Opaque to the engine; interpreted only by the channel's sender.
    #[serde(default)]
    pub params: Value,
}

/// The channel sender families the engine ships.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Email,
    Slack,
    Discord,
    Webhook,
    Sms,
    Pagerduty,
}

impl ChannelKind {
    /// Returns the lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Slack => "slack",
            Self::Discord => "discord",
            Self::Webhook => "webhook",
            Self::Sms => "sms",
            Self::Pagerduty => "pagerduty",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The reference rule set applied when configuration defines no rules.
pub fn default_rules() -> Vec<RuleConfig> {
    vec![
        RuleConfig {
            name: "high-connection-count".to_string(),
            enabled: true,
            severity: Severity::Warning,
            cooldown_minutes: 15,
            message: None,
            kind: RuleKind::Threshold {
                metric: MetricKey::ActiveConnections,
                op: CompareOp::Gt,
                value: 750.0,
            },
        },
        RuleConfig {
            name: "critical-connection-count".to_string(),
            enabled: true,
            severity: Severity::Critical,
            cooldown_minutes: 5,
            message: None,
            kind: RuleKind::Threshold {
                metric: MetricKey::ActiveConnections,
                op: CompareOp::Gt,
                value: 900.0,
            },
        },
        RuleConfig {
            name: "high-error-rate".to_string(),
            enabled: true,
            severity: Severity::Warning,
            cooldown_minutes: 10,
            message: None,
            kind: RuleKind::Threshold {
                metric: MetricKey::ErrorRate,
                op: CompareOp::Gt,
                value: 10.0,
            },
        },
        RuleConfig {
            name: "critical-error-rate".to_string(),
            enabled: true,
            severity: Severity::Critical,
            cooldown_minutes: 5,
            message: None,
            kind: RuleKind::Threshold {
                metric: MetricKey::ErrorRate,
                op: CompareOp::Gt,
                value: 25.0,
            },
        },
        RuleConfig {
            name: "high-latency".to_string(),
            enabled: true,
            severity: Severity::Warning,
            cooldown_minutes: 10,
            message: None,
            kind: RuleKind::Threshold {
                metric: MetricKey::AvgLatencyMs,
                op: CompareOp::Gt,
                value: 2000.0,
            },
        },
        RuleConfig {
            name: "high-memory-usage".to_string(),
            enabled: true,
            severity: Severity::Warning,
            cooldown_minutes: 20,
            message: None,
            kind: RuleKind::Threshold {
                metric: MetricKey::MemoryUsageMb,
                op: CompareOp::Gt,
                value: 200.0,
            },
        },
        RuleConfig {
            name: "high-drop-rate".to_string(),
            enabled: true,
            severity: Severity::Warning,
            cooldown_minutes: 15,
            message: None,
            kind: RuleKind::DropRate {
                max_ratio: 0.2,
                min_connection_rate: 1.0,
            },
        },
        RuleConfig {
            name: "service-unhealthy".to_string(),
            enabled: true,
            severity: Severity::Critical,
            cooldown_minutes: 10,
            message: None,
            kind: RuleKind::Unhealthy,
        },
    ]
}

fn default_send_timeout() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

fn default_severity_filter() -> Vec<Severity> {
    Severity::ALL.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rules_match_reference_table() {
        let rules = default_rules();
        assert_eq!(rules.len(), 8);

        let high_conn = &rules[0];
        assert_eq!(high_conn.name, "high-connection-count");
        assert_eq!(high_conn.severity, Severity::Warning);
        assert_eq!(high_conn.cooldown_minutes, 15);
        match &high_conn.kind {
            RuleKind::Threshold { metric, op, value } => {
                assert_eq!(*metric, MetricKey::ActiveConnections);
                assert_eq!(*op, CompareOp::Gt);
                assert_eq!(*value, 750.0);
            }
            other => panic!("unexpected kind: {other:?}"),
        }

        let unhealthy = &rules[7];
        assert_eq!(unhealthy.name, "service-unhealthy");
        assert_eq!(unhealthy.severity, Severity::Critical);
        assert!(matches!(unhealthy.kind, RuleKind::Unhealthy));
    }

    #[test]
    fn test_rule_config_deserializes_flattened_kind() {
        let json = serde_json::json!({
            "name": "low-traffic",
            "severity": "info",
            "cooldown_minutes": 30,
            "kind": "threshold",
            "metric": "message_rate",
            "op": "lt",
            "value": 0.5
        });
        let rule: RuleConfig = serde_json::from_value(json).expect("deserialize");
        assert!(rule.enabled);
        assert!(matches!(
            rule.kind,
            RuleKind::Threshold {
                metric: MetricKey::MessageRate,
                op: CompareOp::Lt,
                ..
            }
        ));
    }

    #[test]
    fn test_channel_defaults() {
        let json = serde_json::json!({
            "name": "ops-slack",
            "kind": "slack",
            "params": {"webhook_url": "https://hooks.example.com/T00/B00"}
        });
        let channel: ChannelConfig = serde_json::from_value(json).expect("deserialize");
        assert!(channel.enabled);
        assert_eq!(channel.rate_limit_minutes, 0);
        assert_eq!(channel.severity_filter.len(), 4);
    }

    #[test]
    fn test_compare_op() {
        assert!(CompareOp::Gt.compare(2.0, 1.0));
        assert!(!CompareOp::Gt.compare(1.0, 1.0));
        assert!(CompareOp::Gte.compare(1.0, 1.0));
        assert!(CompareOp::Lt.compare(0.5, 1.0));
        assert!(CompareOp::Lte.compare(1.0, 1.0));
        assert_eq!(CompareOp::Gt.symbol(), ">");
    }
}
