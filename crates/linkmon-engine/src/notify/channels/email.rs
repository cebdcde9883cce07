//! SMTP email sender.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use linkmon_core::config::alerting::ChannelKind;
use linkmon_core::error::ErrorKind;
use linkmon_core::{EngineError, EngineResult};

use crate::notify::{AlertPayload, AlertSender};

use super::{parse_params, MAX_SEND_ATTEMPTS};

#[derive(Debug, Deserialize)]
struct EmailParams {
    smtp_host: String,
    #[serde(default = "default_smtp_port")]
    smtp_port: u16,
    #[serde(default)]
    smtp_username: Option<String>,
    #[serde(default)]
    smtp_password: Option<String>,
    from: String,
    to: Vec<String>,
}

fn default_smtp_port() -> u16 {
    587
}

#[derive(Debug)]
pub struct EmailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
}

impl EmailSender {
    pub fn from_params(params: &Value) -> EngineResult<Self> {
        let params: EmailParams = parse_params(ChannelKind::Email, params)?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&params.smtp_host)
            .map_err(|e| {
                EngineError::with_source(
                    ErrorKind::Configuration,
                    format!("invalid smtp host '{}': {e}", params.smtp_host),
                    e,
                )
            })?
            .port(params.smtp_port);
        if let (Some(user), Some(pass)) = (params.smtp_username, params.smtp_password) {
            builder = builder.credentials(Credentials::new(user, pass));
        }

        // Addresses parse at build time so a bad channel fails at startup.
        let from = parse_mailbox(&params.from)?;
        let to = params
            .to
            .iter()
            .map(|addr| parse_mailbox(addr))
            .collect::<EngineResult<Vec<_>>>()?;
        if to.is_empty() {
            return Err(EngineError::configuration(
                "email channel has no recipients",
            ));
        }

        Ok(Self {
            transport: builder.build(),
            from,
            to,
        })
    }

    fn compose(&self, payload: &AlertPayload, to: &Mailbox) -> EngineResult<Message> {
        let test_tag = if payload.test { " [test]" } else { "" };
        let subject = format!(
            "[linkmon][{}]{} {}",
            payload.severity, test_tag, payload.alert_type
        );
        let metadata =
            serde_json::to_string_pretty(&payload.metadata).unwrap_or_else(|_| "{}".to_string());
        let body = format!(
            "Alert: {}\nSeverity: {}\nTime: {}\n\n{}\n\nContext:\n{}\n",
            payload.alert_type,
            payload.severity,
            payload.timestamp.to_rfc3339(),
            payload.message,
            metadata,
        );
        Message::builder()
            .from(self.from.clone())
            .to(to.clone())
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| {
                EngineError::with_source(ErrorKind::Delivery, format!("failed to compose email: {e}"), e)
            })
    }
}

#[async_trait]
impl AlertSender for EmailSender {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Email
    }

    async fn send(&self, payload: &AlertPayload) -> EngineResult<()> {
        let mut last_err = None;
        for recipient in &self.to {
            let email = self.compose(payload, recipient)?;
            if let Err(err) = self.send_with_retry(email, recipient).await {
                last_err = Some(err);
            }
        }
        match last_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl EmailSender {
    async fn send_with_retry(&self, email: Message, recipient: &Mailbox) -> EngineResult<()> {
        let mut attempt = 0u32;
        loop {
            match self.transport.send(email.clone()).await {
                Ok(_) => return Ok(()),
                Err(e) => {
                    attempt += 1;
                    warn!(attempt, recipient = %recipient, error = %e, "email send failed, retrying");
                    if attempt >= MAX_SEND_ATTEMPTS {
                        return Err(EngineError::with_source(
                            ErrorKind::Delivery,
                            format!("smtp send to {recipient} failed: {e}"),
                            e,
                        ));
                    }
                    tokio::time::sleep(Duration::from_millis(100 * 2u64.pow(attempt - 1))).await;
                }
            }
        }
    }
}

fn parse_mailbox(addr: &str) -> EngineResult<Mailbox> {
    addr.parse::<Mailbox>().map_err(|e| {
        EngineError::with_source(
            ErrorKind::Configuration,
            format!("invalid email address '{addr}': {e}"),
            e,
        )
    })
}
