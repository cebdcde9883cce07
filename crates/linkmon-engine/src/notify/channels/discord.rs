//! Discord webhook sender.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use linkmon_core::config::alerting::ChannelKind;
use linkmon_core::types::Severity;
use linkmon_core::EngineResult;

use crate::notify::{AlertPayload, AlertSender};

use super::{parse_params, post_json_with_retry};

#[derive(Debug, Deserialize)]
struct DiscordParams {
    webhook_url: String,
}

pub struct DiscordSender {
    client: reqwest::Client,
    webhook_url: String,
}

impl DiscordSender {
    pub fn from_params(params: &Value) -> EngineResult<Self> {
        let params: DiscordParams = parse_params(ChannelKind::Discord, params)?;
        Ok(Self {
            client: reqwest::Client::new(),
            webhook_url: params.webhook_url,
        })
    }

    fn body(payload: &AlertPayload) -> Value {
        let title = if payload.test {
            format!("{} (test)", payload.alert_type)
        } else {
            payload.alert_type.clone()
        };
        json!({
            "embeds": [{
                "title": title,
                "description": payload.message,
                "color": embed_color(payload.severity),
                "timestamp": payload.timestamp.to_rfc3339(),
                "footer": {"text": format!("severity: {}", payload.severity)},
            }],
        })
    }
}

#[async_trait]
impl AlertSender for DiscordSender {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Discord
    }

    async fn send(&self, payload: &AlertPayload) -> EngineResult<()> {
        let body = Self::body(payload);
        post_json_with_retry(&self.client, &self.webhook_url, None, &body).await
    }
}

// Discord embed colors are decimal RGB.
fn embed_color(severity: Severity) -> u32 {
    match severity {
        Severity::Info => 0x3498db,
        Severity::Warning => 0xf1c40f,
        Severity::Critical => 0xe74c3c,
        Severity::Emergency => 0x992d22,
    }
}
