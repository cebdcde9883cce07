#![allow(dead_code)]

//! Shared helpers for the engine-level integration tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use linkmon_core::config::EngineConfig;
use linkmon_core::config::alerting::{ChannelConfig, ChannelKind, CompareOp, RuleConfig, RuleKind};
use linkmon_core::events::TransportEvent;
use linkmon_core::metrics::MetricKey;
use linkmon_core::types::{ConnectionId, ConnectionStatus, MessageDirection, Severity};
use linkmon_core::{EngineError, EngineResult};
use linkmon_engine::MonitorEngine;
use linkmon_engine::notify::{AlertPayload, AlertSender};

/// Sender that records payloads instead of leaving the process.
pub struct MockSender {
    pub fail: bool,
    pub calls: Mutex<Vec<AlertPayload>>,
}

impl MockSender {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self {
            fail: false,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl AlertSender for MockSender {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Webhook
    }

    async fn send(&self, payload: &AlertPayload) -> EngineResult<()> {
        self.calls.lock().unwrap().push(payload.clone());
        if self.fail {
            Err(EngineError::delivery("mock failure"))
        } else {
            Ok(())
        }
    }
}

/// A config with no rules and fast ticks, so nothing fires on its own.
pub fn quiet_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.alerting.rules = Vec::new();
    config.telemetry.tick_interval_seconds = 1;
    config
}

pub fn channel(name: &str, severities: &[Severity], rate_limit_minutes: u64) -> ChannelConfig {
    ChannelConfig {
        name: name.to_string(),
        kind: ChannelKind::Webhook,
        enabled: true,
        severity_filter: severities.to_vec(),
        rate_limit_minutes,
        params: serde_json::Value::Null,
    }
}

pub fn threshold_rule(
    name: &str,
    severity: Severity,
    cooldown_minutes: u64,
    metric: MetricKey,
    op: CompareOp,
    value: f64,
) -> RuleConfig {
    RuleConfig {
        name: name.to_string(),
        enabled: true,
        severity,
        cooldown_minutes,
        message: None,
        kind: RuleKind::Threshold { metric, op, value },
    }
}

/// Opens a connection and moves it to `connected`.
pub fn open_and_connect(engine: &MonitorEngine, id: &str) {
    engine
        .handle_event(TransportEvent::Opened {
            id: ConnectionId::new(id),
            user_id: Some("u1".to_string()),
            endpoint: "/ws/feed".to_string(),
        })
        .expect("open");
    engine
        .handle_event(TransportEvent::StatusChanged {
            id: ConnectionId::new(id),
            status: ConnectionStatus::Connected,
        })
        .expect("connect");
}

/// Records `count` received messages with the same latency sample.
pub fn send_messages(engine: &MonitorEngine, id: &str, count: usize, latency_ms: f64) {
    for _ in 0..count {
        engine
            .handle_event(TransportEvent::Message {
                id: ConnectionId::new(id),
                direction: MessageDirection::Received,
                size_bytes: 256,
                latency_ms: Some(latency_ms),
            })
            .expect("message");
    }
}
