//! PagerDuty Events API v2 sender.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use linkmon_core::config::alerting::ChannelKind;
use linkmon_core::types::Severity;
use linkmon_core::EngineResult;

use crate::notify::{AlertPayload, AlertSender};

use super::{parse_params, post_json_with_retry};

const EVENTS_API_URL: &str = "https://events.pagerduty.com/v2/enqueue";

#[derive(Debug, Deserialize)]
struct PagerdutyParams {
    routing_key: String,
    #[serde(default)]
    source: Option<String>,
    /// Events API endpoint override, for regional endpoints and tests.
    #[serde(default)]
    endpoint: Option<String>,
}

pub struct PagerdutySender {
    client: reqwest::Client,
    routing_key: String,
    source: String,
    endpoint: String,
}

impl PagerdutySender {
    pub fn from_params(params: &Value) -> EngineResult<Self> {
        let params: PagerdutyParams = parse_params(ChannelKind::Pagerduty, params)?;
        Ok(Self {
            client: reqwest::Client::new(),
            routing_key: params.routing_key,
            source: params.source.unwrap_or_else(|| "linkmon".to_string()),
            endpoint: params.endpoint.unwrap_or_else(|| EVENTS_API_URL.to_string()),
        })
    }

    fn body(&self, payload: &AlertPayload) -> Value {
        json!({
            "routing_key": self.routing_key,
            "event_action": "trigger",
            "dedup_key": payload.alert_id,
            "payload": {
                "summary": payload.message,
                "source": self.source,
                "severity": event_severity(payload.severity),
                "timestamp": payload.timestamp.to_rfc3339(),
                "custom_details": payload.metadata,
            },
        })
    }
}

#[async_trait]
impl AlertSender for PagerdutySender {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Pagerduty
    }

    async fn send(&self, payload: &AlertPayload) -> EngineResult<()> {
        let body = self.body(payload);
        post_json_with_retry(&self.client, &self.endpoint, None, &body).await
    }
}

// The Events API accepts info|warning|error|critical only.
fn event_severity(severity: Severity) -> &'static str {
    match severity {
        Severity::Info => "info",
        Severity::Warning => "warning",
        Severity::Critical => "critical",
        Severity::Emergency => "critical",
    }
}
