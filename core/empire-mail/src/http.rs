//! Transactional mail over a JSON HTTP API.
//!
//! The provider receives `POST {endpoint}` with a bearer token and a body of
//! `{from, to, subject, html, text}`. Any 2xx counts as accepted.

use crate::error::{MailError, MailResult};
use crate::sender::{check_recipient, EmailMessage, EmailSender};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for [`HttpMailer`].
#[derive(Debug, Clone)]
pub struct HttpMailerConfig {
    /// Full URL of the provider's send endpoint.
    pub endpoint: String,
    /// Bearer token, if the provider requires one.
    pub api_key: Option<String>,
    /// `From` header, e.g. `Empire Run <no-reply@empirerun.game>`.
    pub from: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

/// [`EmailSender`] backed by an HTTP mail provider.
pub struct HttpMailer {
    client: Client,
    config: HttpMailerConfig,
}

impl HttpMailer {
    /// Builds a mailer with its own HTTP client.
    pub fn new(config: HttpMailerConfig) -> MailResult<Self> {
        if config.endpoint.trim().is_empty() {
            return Err(MailError::Config("mail endpoint is empty".to_string()));
        }
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl EmailSender for HttpMailer {
    async fn send(&self, to: &str, message: &EmailMessage) -> MailResult<()> {
        check_recipient(to)?;

        let body = SendRequest {
            from: &self.config.from,
            to,
            subject: &message.subject,
            html: &message.html,
            text: &message.text,
        };

        let mut request = self.client.post(&self.config.endpoint).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Mail provider refused message to {}: {} {}", to, status, body);
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!("Mail accepted for {}", to);
        Ok(())
    }
}
