//! Alert fan-out and delivery bookkeeping.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use linkmon_core::alert::{Alert, TEST_METADATA_KEY};
use linkmon_core::config::alerting::{AlertingConfig, ChannelConfig};
use linkmon_core::types::Severity;
use linkmon_core::{EngineError, EngineResult};

use super::channels;
use super::history::{AlertHistory, AlertHistoryEntry, DeliveryStats};
use super::{AlertPayload, AlertSender};

/// Alert type stamped on synthetic wiring-check alerts.
pub const TEST_ALERT_TYPE: &str = "test-alert";

struct ChannelState {
    config: ChannelConfig,
    sender: Arc<dyn AlertSender>,
    last_sent: Option<DateTime<Utc>>,
}

impl ChannelState {
    fn eligible(&self, severity: Severity, now: DateTime<Utc>) -> bool {
        if !self.config.enabled {
            return false;
        }
        if !self.config.severity_filter.contains(&severity) {
            return false;
        }
        if self.config.rate_limit_minutes > 0 {
            if let Some(last) = self.last_sent {
                let limit = chrono::Duration::minutes(self.config.rate_limit_minutes as i64);
                if now.signed_duration_since(last) < limit {
                    return false;
                }
            }
        }
        true
    }
}

struct ManagerInner {
    channels: Vec<ChannelState>,
    history: AlertHistory,
}

/// Routes alerts to eligible channels and records every outcome.
///
/// One async mutex guards channel state and history together; it is held
/// for a whole alert's fan-out, so alerts are processed strictly in arrival
/// order and history entries never interleave. Within one alert, sends to
/// distinct channels run concurrently under the per-send timeout.
pub struct DeliveryManager {
    inner: Mutex<ManagerInner>,
    send_timeout: Duration,
}

impl std::fmt::Debug for DeliveryManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryManager")
            .field("send_timeout", &self.send_timeout)
            .finish()
    }
}

/// What happened to one alert across its eligible channels.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryOutcome {
    pub alert_id: Uuid,
    pub channels_attempted: Vec<String>,
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
    /// True if at least one channel took the alert.
    pub overall_success: bool,
}

impl DeliveryManager {
    /// Builds the manager and its senders from configuration.
    pub fn from_config(config: &AlertingConfig) -> EngineResult<Self> {
        let channels = config
            .channels
            .iter()
            .map(|ch| Ok((ch.clone(), channels::build_sender(ch)?)))
            .collect::<EngineResult<Vec<_>>>()?;
        Self::with_channels(Duration::from_secs(config.send_timeout_seconds), channels)
    }

    /// Builds the manager around caller-supplied senders. Channel names
    /// must be non-empty and unique.
    pub fn with_channels(
        send_timeout: Duration,
        channels: Vec<(ChannelConfig, Arc<dyn AlertSender>)>,
    ) -> EngineResult<Self> {
        let mut seen = HashSet::new();
        let mut states = Vec::with_capacity(channels.len());
        for (config, sender) in channels {
            if config.name.trim().is_empty() {
                return Err(EngineError::configuration("alert channel with empty name"));
            }
            if !seen.insert(config.name.clone()) {
                return Err(EngineError::configuration(format!(
                    "duplicate alert channel name '{}'",
                    config.name
                )));
            }
            states.push(ChannelState {
                config,
                sender,
                last_sent: None,
            });
        }
        Ok(Self {
            inner: Mutex::new(ManagerInner {
                channels: states,
                history: AlertHistory::new(),
            }),
            send_timeout,
        })
    }

    /// Fans one alert out to every eligible channel and records the outcome.
    pub async fn dispatch(&self, alert: &Alert) -> DeliveryOutcome {
        self.dispatch_to(alert, None).await
    }

    /// Builds a synthetic test alert and pushes it through the normal
    /// eligibility and dispatch path, optionally restricted to one channel.
    pub async fn send_test(
        &self,
        severity: Severity,
        channel: Option<&str>,
    ) -> EngineResult<DeliveryOutcome> {
        if let Some(name) = channel {
            let inner = self.inner.lock().await;
            if !inner.channels.iter().any(|ch| ch.config.name == name) {
                return Err(EngineError::not_found(format!(
                    "channel '{name}' is not configured"
                )));
            }
        }
        let alert = Alert::new(
            TEST_ALERT_TYPE,
            severity,
            format!("Manual test alert at severity {severity}"),
        )
        .with_metadata(TEST_METADATA_KEY, json!(true));
        Ok(self.dispatch_to(&alert, channel).await)
    }

    /// The most recent `limit` history entries in chronological order;
    /// `None` returns the whole retained ring.
    pub async fn history(&self, limit: Option<usize>) -> Vec<AlertHistoryEntry> {
        let inner = self.inner.lock().await;
        inner.history.recent(limit)
    }

    /// Statistics replayed from the retained history.
    pub async fn stats(&self) -> DeliveryStats {
        let inner = self.inner.lock().await;
        inner.history.stats()
    }

    pub async fn channel_count(&self) -> usize {
        let inner = self.inner.lock().await;
        inner.channels.len()
    }

    async fn dispatch_to(&self, alert: &Alert, only: Option<&str>) -> DeliveryOutcome {
        let mut inner = self.inner.lock().await;
        let now = Utc::now();

        let eligible: Vec<(usize, String, Arc<dyn AlertSender>)> = inner
            .channels
            .iter()
            .enumerate()
            .filter(|(_, ch)| only.is_none_or(|name| ch.config.name == name))
            .filter(|(_, ch)| ch.eligible(alert.severity, now))
            .map(|(i, ch)| (i, ch.config.name.clone(), Arc::clone(&ch.sender)))
            .collect();

        let channels_attempted: Vec<String> =
            eligible.iter().map(|(_, name, _)| name.clone()).collect();
        if eligible.is_empty() {
            debug!(alert_type = %alert.alert_type, severity = %alert.severity, "no eligible channels for alert");
        }

        let send_timeout = self.send_timeout;
        let sends = eligible.iter().map(|(_, name, sender)| {
            let payload = AlertPayload::new(alert, name);
            let sender = Arc::clone(sender);
            async move { tokio::time::timeout(send_timeout, sender.send(&payload)).await }
        });
        let results = join_all(sends).await;

        let mut succeeded = Vec::new();
        let mut failed = Vec::new();
        for ((index, name, _), result) in eligible.iter().zip(results) {
            match result {
                Ok(Ok(())) => {
                    inner.channels[*index].last_sent = Some(now);
                    succeeded.push(name.clone());
                }
                Ok(Err(err)) => {
                    warn!(channel = %name, error = %err, "alert delivery failed");
                    failed.push(name.clone());
                }
                Err(_) => {
                    warn!(
                        channel = %name,
                        timeout_secs = send_timeout.as_secs_f64(),
                        "alert delivery timed out"
                    );
                    failed.push(name.clone());
                }
            }
        }

        let overall_success = !succeeded.is_empty();
        inner.history.push(AlertHistoryEntry {
            timestamp: now,
            alert: alert.clone(),
            channels_attempted: channels_attempted.clone(),
            overall_success,
        });
        if !channels_attempted.is_empty() {
            info!(
                alert_type = %alert.alert_type,
                severity = %alert.severity,
                attempted = channels_attempted.len(),
                succeeded = succeeded.len(),
                "alert dispatched"
            );
        }

        DeliveryOutcome {
            alert_id: alert.id,
            channels_attempted,
            succeeded,
            failed,
            overall_success,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use linkmon_core::config::alerting::ChannelKind;
    use linkmon_core::error::ErrorKind;
    use std::sync::Mutex as StdMutex;

    struct MockSender {
        fail: bool,
        delay: Option<Duration>,
        calls: Arc<StdMutex<Vec<AlertPayload>>>,
    }

    impl MockSender {
        fn new(fail: bool) -> (Arc<Self>, Arc<StdMutex<Vec<AlertPayload>>>) {
            let calls = Arc::new(StdMutex::new(Vec::new()));
            let sender = Arc::new(Self {
                fail,
                delay: None,
                calls: Arc::clone(&calls),
            });
            (sender, calls)
        }

        fn slow(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                fail: false,
                delay: Some(delay),
                calls: Arc::new(StdMutex::new(Vec::new())),
            })
        }
    }

    #[async_trait]
    impl AlertSender for MockSender {
        fn kind(&self) -> ChannelKind {
            ChannelKind::Webhook
        }

        async fn send(&self, payload: &AlertPayload) -> EngineResult<()> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.calls.lock().unwrap().push(payload.clone());
            if self.fail {
                Err(EngineError::delivery("mock failure"))
            } else {
                Ok(())
            }
        }
    }

    fn channel(name: &str, severities: Vec<Severity>, rate_limit_minutes: u64) -> ChannelConfig {
        ChannelConfig {
            name: name.to_string(),
            kind: ChannelKind::Webhook,
            enabled: true,
            severity_filter: severities,
            rate_limit_minutes,
            params: serde_json::Value::Null,
        }
    }

    fn manager(channels: Vec<(ChannelConfig, Arc<dyn AlertSender>)>) -> DeliveryManager {
        DeliveryManager::with_channels(Duration::from_secs(5), channels).expect("manager")
    }

    fn warning_alert() -> Alert {
        Alert::new("high-error-rate", Severity::Warning, "error rate at 12/min")
    }

    #[tokio::test]
    async fn test_dispatch_fans_out_to_eligible_channels() {
        let (a, a_calls) = MockSender::new(false);
        let (b, b_calls) = MockSender::new(false);
        let manager = manager(vec![
            (channel("ops", Severity::ALL.to_vec(), 0), a),
            (channel("page", Severity::ALL.to_vec(), 0), b),
        ]);

        let outcome = manager.dispatch(&warning_alert()).await;
        assert_eq!(outcome.channels_attempted, vec!["ops", "page"]);
        assert!(outcome.overall_success);
        assert_eq!(a_calls.lock().unwrap().len(), 1);
        assert_eq!(b_calls.lock().unwrap().len(), 1);
        assert_eq!(a_calls.lock().unwrap()[0].channel, "ops");

        let history = manager.history(None).await;
        assert_eq!(history.len(), 1);
        assert!(history[0].overall_success);
    }

    #[tokio::test]
    async fn test_disabled_and_filtered_channels_never_attempted() {
        let (a, _) = MockSender::new(false);
        let (b, _) = MockSender::new(false);
        let mut disabled = channel("muted", Severity::ALL.to_vec(), 0);
        disabled.enabled = false;
        let critical_only = channel("page", vec![Severity::Critical, Severity::Emergency], 0);

        let manager = manager(vec![(disabled, a), (critical_only, b)]);
        let outcome = manager.dispatch(&warning_alert()).await;
        assert!(outcome.channels_attempted.is_empty());
        assert!(!outcome.overall_success);

        // The entry is still recorded, with nothing attempted.
        let history = manager.history(None).await;
        assert_eq!(history.len(), 1);
        assert!(history[0].channels_attempted.is_empty());
    }

    #[tokio::test]
    async fn test_rate_limit_applies_after_successful_send() {
        let (a, _) = MockSender::new(false);
        let (b, _) = MockSender::new(false);
        let manager = manager(vec![
            (channel("ops", Severity::ALL.to_vec(), 60), a),
            (channel("page", Severity::ALL.to_vec(), 0), b),
        ]);

        let first = manager.dispatch(&warning_alert()).await;
        assert_eq!(first.channels_attempted, vec!["ops", "page"]);

        let second = manager.dispatch(&warning_alert()).await;
        assert_eq!(second.channels_attempted, vec!["page"]);
    }

    #[tokio::test]
    async fn test_failed_send_does_not_start_rate_limit() {
        let (a, _) = MockSender::new(true);
        let manager = manager(vec![(channel("ops", Severity::ALL.to_vec(), 60), a)]);

        let first = manager.dispatch(&warning_alert()).await;
        assert_eq!(first.failed, vec!["ops"]);

        // last_sent was never set, so the channel stays eligible.
        let second = manager.dispatch(&warning_alert()).await;
        assert_eq!(second.channels_attempted, vec!["ops"]);
    }

    #[tokio::test]
    async fn test_channel_failure_is_isolated() {
        let (bad, _) = MockSender::new(true);
        let (good, _) = MockSender::new(false);
        let manager = manager(vec![
            (channel("flaky", Severity::ALL.to_vec(), 0), bad),
            (channel("steady", Severity::ALL.to_vec(), 0), good),
        ]);

        let outcome = manager.dispatch(&warning_alert()).await;
        assert_eq!(outcome.channels_attempted.len(), 2);
        assert_eq!(outcome.failed, vec!["flaky"]);
        assert_eq!(outcome.succeeded, vec!["steady"]);
        assert!(outcome.overall_success);

        let history = manager.history(None).await;
        assert!(history[0].overall_success);
        assert_eq!(history[0].channels_attempted.len(), 2);
    }

    #[tokio::test]
    async fn test_hung_sender_times_out_as_failure() {
        let slow = MockSender::slow(Duration::from_secs(5));
        let manager = DeliveryManager::with_channels(
            Duration::from_millis(50),
            vec![(channel("stuck", Severity::ALL.to_vec(), 0), slow as Arc<dyn AlertSender>)],
        )
        .expect("manager");

        let outcome = manager.dispatch(&warning_alert()).await;
        assert_eq!(outcome.failed, vec!["stuck"]);
        assert!(!outcome.overall_success);
    }

    #[tokio::test]
    async fn test_send_test_rejects_unknown_channel() {
        let (a, _) = MockSender::new(false);
        let manager = manager(vec![(channel("ops", Severity::ALL.to_vec(), 0), a)]);

        let err = manager
            .send_test(Severity::Info, Some("nonexistent"))
            .await
            .expect_err("unknown channel");
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_send_test_targets_one_channel() {
        let (a, a_calls) = MockSender::new(false);
        let (b, b_calls) = MockSender::new(false);
        let manager = manager(vec![
            (channel("ops", Severity::ALL.to_vec(), 0), a),
            (channel("page", Severity::ALL.to_vec(), 0), b),
        ]);

        let outcome = manager
            .send_test(Severity::Info, Some("page"))
            .await
            .expect("test send");
        assert_eq!(outcome.channels_attempted, vec!["page"]);
        assert!(a_calls.lock().unwrap().is_empty());

        let calls = b_calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].test);
        assert_eq!(calls[0].alert_type, TEST_ALERT_TYPE);

        let history = manager.history(None).await;
        assert!(history[0].alert.is_test());
    }

    #[tokio::test]
    async fn test_stats_reflect_dispatch_outcomes() {
        let (good, _) = MockSender::new(false);
        let (bad, _) = MockSender::new(true);
        let manager = manager(vec![
            (channel("ops", Severity::ALL.to_vec(), 0), good),
            (channel("flaky", vec![Severity::Critical], 0), bad),
        ]);

        manager.dispatch(&warning_alert()).await;
        manager
            .dispatch(&Alert::new("service-unhealthy", Severity::Critical, "checks failing"))
            .await;

        let stats = manager.stats().await;
        assert_eq!(stats.total_alerts, 2);
        assert_eq!(stats.success_rate, 1.0);
        assert_eq!(stats.by_severity[&Severity::Warning], 1);
        assert_eq!(stats.channels["ops"].sent, 2);
        // flaky failed its send, but the entry overall succeeded via ops.
        assert_eq!(stats.channels["flaky"].sent, 1);
    }

    #[test]
    fn test_duplicate_channel_names_rejected() {
        let (a, _) = MockSender::new(false);
        let (b, _) = MockSender::new(false);
        let result = DeliveryManager::with_channels(
            Duration::from_secs(5),
            vec![
                (channel("twin", Severity::ALL.to_vec(), 0), a as Arc<dyn AlertSender>),
                (channel("twin", Severity::ALL.to_vec(), 0), b as Arc<dyn AlertSender>),
            ],
        );
        assert!(result.is_err());
    }
}
