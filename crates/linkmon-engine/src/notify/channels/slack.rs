//! Slack incoming-webhook sender.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use linkmon_core::config::alerting::ChannelKind;
use linkmon_core::types::Severity;
use linkmon_core::EngineResult;

use crate::notify::{AlertPayload, AlertSender};

use super::{parse_params, post_json_with_retry};

#[derive(Debug, Deserialize)]
struct SlackParams {
    webhook_url: String,
    #[serde(default)]
    username: Option<String>,
}

pub struct SlackSender {
    client: reqwest::Client,
    webhook_url: String,
    username: Option<String>,
}

impl SlackSender {
    pub fn from_params(params: &Value) -> EngineResult<Self> {
        let params: SlackParams = parse_params(ChannelKind::Slack, params)?;
        Ok(Self {
            client: reqwest::Client::new(),
            webhook_url: params.webhook_url,
            username: params.username,
        })
    }

    fn body(&self, payload: &AlertPayload) -> Value {
        let title = if payload.test {
            format!("[{}] {} (test)", payload.severity.as_str().to_uppercase(), payload.message)
        } else {
            format!("[{}] {}", payload.severity.as_str().to_uppercase(), payload.message)
        };
        let mut body = json!({
            "text": title,
            "attachments": [{
                "color": attachment_color(payload.severity),
                "fields": [
                    {"title": "Type", "value": payload.alert_type, "short": true},
                    {"title": "Severity", "value": payload.severity.as_str(), "short": true},
                ],
                "ts": payload.timestamp.timestamp(),
            }],
        });
        if let Some(username) = &self.username {
            body["username"] = json!(username);
        }
        body
    }
}

#[async_trait]
impl AlertSender for SlackSender {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Slack
    }

    async fn send(&self, payload: &AlertPayload) -> EngineResult<()> {
        let body = self.body(payload);
        post_json_with_retry(&self.client, &self.webhook_url, None, &body).await
    }
}

fn attachment_color(severity: Severity) -> &'static str {
    match severity {
        Severity::Info => "#439fe0",
        Severity::Warning => "warning",
        Severity::Critical => "danger",
        Severity::Emergency => "#8b0000",
    }
}
