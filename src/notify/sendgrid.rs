use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::Notifier;
use crate::config::MailSettings;
use crate::digest::DigestMessage;

pub const SENDGRID_ENDPOINT: &str = "https://api.sendgrid.com/v3/mail/send";
pub const SENDER_NAME: &str = "HR News Bot";
const SEND_TIMEOUT: Duration = Duration::from_secs(20);

/// SendGrid v3 mail API, bearer-authenticated.
#[derive(Clone)]
pub struct SendGridNotifier {
    endpoint: String,
    api_key: String,
    from: String,
    to: Vec<String>,
    client: Client,
}

impl SendGridNotifier {
    /// `None` (with a warning) when the key, sender or recipients are missing.
    pub fn from_settings(mail: &MailSettings) -> Option<Self> {
        match (&mail.sendgrid_api_key, &mail.from) {
            (Some(key), Some(from)) if !mail.to.is_empty() => {
                Some(Self::new(key.clone(), from.clone(), mail.to.clone()))
            }
            _ => {
                tracing::warn!("SendGrid secrets are missing, sendgrid sink disabled");
                None
            }
        }
    }

    pub fn new(api_key: String, from: String, to: Vec<String>) -> Self {
        Self {
            endpoint: SENDGRID_ENDPOINT.to_string(),
            api_key,
            from,
            to,
            client: Client::new(),
        }
    }

    #[cfg(test)]
    fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn payload(&self, msg: &DigestMessage) -> SendGridPayload {
        SendGridPayload {
            personalizations: vec![Personalization {
                to: self
                    .to
                    .iter()
                    .map(|a| Address {
                        email: a.clone(),
                        name: None,
                    })
                    .collect(),
            }],
            from: Address {
                email: self.from.clone(),
                name: Some(SENDER_NAME.to_string()),
            },
            subject: msg.subject.clone(),
            content: vec![Content {
                kind: "text/plain".to_string(),
                value: msg.body.clone(),
            }],
        }
    }
}

#[async_trait::async_trait]
impl Notifier for SendGridNotifier {
    async fn send(&self, msg: &DigestMessage) -> Result<()> {
        let rsp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .timeout(SEND_TIMEOUT)
            .json(&self.payload(msg))
            .send()
            .await
            .context("sendgrid post")?;

        let status = rsp.status();
        if !status.is_success() {
            let body = rsp.text().await.unwrap_or_default();
            return Err(anyhow!("sendgrid HTTP {status}: {body}"));
        }
        // 202 Accepted on success
        tracing::info!(status = status.as_u16(), "email sent");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "sendgrid"
    }
}

#[derive(Debug, Serialize)]
pub struct SendGridPayload {
    personalizations: Vec<Personalization>,
    from: Address,
    subject: String,
    content: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Personalization {
    to: Vec<Address>,
}

#[derive(Debug, Serialize)]
struct Address {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(rename = "type")]
    kind: String,
    value: String,
}
