//! Channel sender implementations, one per [`ChannelKind`].

mod discord;
mod email;
mod pagerduty;
mod slack;
mod sms;
mod webhook;

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use linkmon_core::config::alerting::{ChannelConfig, ChannelKind};
use linkmon_core::error::ErrorKind;
use linkmon_core::{EngineError, EngineResult};

use super::AlertSender;

pub use discord::DiscordSender;
pub use email::EmailSender;
pub use pagerduty::PagerdutySender;
pub use slack::SlackSender;
pub use sms::SmsSender;
pub use webhook::WebhookSender;

/// Transport-level attempts per send before a delivery error surfaces.
const MAX_SEND_ATTEMPTS: u32 = 3;

/// Builds the sender a channel configuration describes, validating its
/// params eagerly so bad channel config fails at startup, not at the first
/// alert.
pub fn build_sender(config: &ChannelConfig) -> EngineResult<Arc<dyn AlertSender>> {
    Ok(match config.kind {
        ChannelKind::Slack => Arc::new(SlackSender::from_params(&config.params)?),
        ChannelKind::Discord => Arc::new(DiscordSender::from_params(&config.params)?),
        ChannelKind::Webhook => Arc::new(WebhookSender::from_params(&config.params)?),
        ChannelKind::Email => Arc::new(EmailSender::from_params(&config.params)?),
        ChannelKind::Sms => Arc::new(SmsSender::from_params(&config.params)?),
        ChannelKind::Pagerduty => Arc::new(PagerdutySender::from_params(&config.params)?),
    })
}

/// Deserializes a channel's opaque params into the sender's own shape.
fn parse_params<T: DeserializeOwned>(kind: ChannelKind, params: &Value) -> EngineResult<T> {
    serde_json::from_value(params.clone())
        .map_err(|e| EngineError::configuration(format!("invalid {kind} channel params: {e}")))
}

/// POSTs a JSON body, retrying transient failures with exponential backoff.
async fn post_json_with_retry(
    client: &reqwest::Client,
    url: &str,
    bearer: Option<&str>,
    body: &Value,
) -> EngineResult<()> {
    let mut last_err = EngineError::delivery("no send attempted");
    for attempt in 0..MAX_SEND_ATTEMPTS {
        let mut request = client.post(url).json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        match request.send().await {
            Ok(response) if response.status().is_success() => return Ok(()),
            Ok(response) => {
                let status = response.status();
                warn!(attempt = attempt + 1, status = %status, "post returned non-success status, retrying");
                last_err = EngineError::delivery(format!("HTTP {status} response"));
            }
            Err(err) => {
                warn!(attempt = attempt + 1, error = %err, "post failed, retrying");
                last_err =
                    EngineError::with_source(ErrorKind::Delivery, format!("request failed: {err}"), err);
            }
        }
        if attempt + 1 < MAX_SEND_ATTEMPTS {
            tokio::time::sleep(Duration::from_millis(100 * 2u64.pow(attempt))).await;
        }
    }
    Err(last_err)
}
