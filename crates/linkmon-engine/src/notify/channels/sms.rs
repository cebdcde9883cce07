//! SMS sender backed by an HTTP gateway.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use linkmon_core::config::alerting::ChannelKind;
use linkmon_core::{EngineError, EngineResult};

use crate::notify::{AlertPayload, AlertSender};

use super::{parse_params, post_json_with_retry};

/// Single-segment SMS length; longer texts are truncated with an ellipsis.
const MAX_SMS_CHARS: usize = 160;

#[derive(Debug, Deserialize)]
struct SmsParams {
    gateway_url: String,
    #[serde(default)]
    api_key: Option<String>,
    to: Vec<String>,
}

#[derive(Debug)]
pub struct SmsSender {
    client: reqwest::Client,
    gateway_url: String,
    api_key: Option<String>,
    to: Vec<String>,
}

impl SmsSender {
    pub fn from_params(params: &Value) -> EngineResult<Self> {
        let params: SmsParams = parse_params(ChannelKind::Sms, params)?;
        if params.to.is_empty() {
            return Err(EngineError::configuration("sms channel has no recipients"));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            gateway_url: params.gateway_url,
            api_key: params.api_key,
            to: params.to,
        })
    }
}

#[async_trait]
impl AlertSender for SmsSender {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Sms
    }

    async fn send(&self, payload: &AlertPayload) -> EngineResult<()> {
        let text = sms_text(payload);
        let mut last_err = None;
        for number in &self.to {
            let body = json!({"to": number, "message": text});
            if let Err(err) =
                post_json_with_retry(&self.client, &self.gateway_url, self.api_key.as_deref(), &body)
                    .await
            {
                last_err = Some(err);
            }
        }
        match last_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn sms_text(payload: &AlertPayload) -> String {
    let text = format!(
        "[{}] {}",
        payload.severity.as_str().to_uppercase(),
        payload.message
    );
    if text.chars().count() <= MAX_SMS_CHARS {
        return text;
    }
    let truncated: String = text.chars().take(MAX_SMS_CHARS - 3).collect();
    format!("{truncated}...")
}
