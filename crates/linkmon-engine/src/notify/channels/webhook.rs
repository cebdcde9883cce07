//! Generic JSON webhook sender: posts the whole payload verbatim.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use linkmon_core::config::alerting::ChannelKind;
use linkmon_core::EngineResult;

use crate::notify::{AlertPayload, AlertSender};

use super::{parse_params, post_json_with_retry};

#[derive(Debug, Deserialize)]
struct WebhookParams {
    url: String,
    #[serde(default)]
    bearer_token: Option<String>,
}

pub struct WebhookSender {
    client: reqwest::Client,
    url: String,
    bearer_token: Option<String>,
}

impl WebhookSender {
    pub fn from_params(params: &Value) -> EngineResult<Self> {
        let params: WebhookParams = parse_params(ChannelKind::Webhook, params)?;
        Ok(Self {
            client: reqwest::Client::new(),
            url: params.url,
            bearer_token: params.bearer_token,
        })
    }
}

#[async_trait]
impl AlertSender for WebhookSender {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Webhook
    }

    async fn send(&self, payload: &AlertPayload) -> EngineResult<()> {
        let body = serde_json::to_value(payload)?;
        post_json_with_retry(&self.client, &self.url, self.bearer_token.as_deref(), &body).await
    }
}
