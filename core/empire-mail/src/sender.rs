//! The outbound email contract.

use crate::error::{MailError, MailResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A rendered email, ready to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Anything able to deliver an [`EmailMessage`].
///
/// `send` resolves only once the provider has accepted or refused the
/// message; callers treat `Err` as "not delivered".
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, to: &str, message: &EmailMessage) -> MailResult<()>;
}

/// Sender that only logs the message. Used when no provider is configured.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl EmailSender for LogMailer {
    async fn send(&self, to: &str, message: &EmailMessage) -> MailResult<()> {
        check_recipient(to)?;
        tracing::info!("[mail] to={} subject={:?}", to, message.subject);
        tracing::debug!("[mail] body:\n{}", message.text);
        Ok(())
    }
}

/// Rejects recipients that obviously cannot be delivered to.
pub(crate) fn check_recipient(to: &str) -> MailResult<()> {
    let to = to.trim();
    match to.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(MailError::InvalidRecipient(to.to_string())),
    }
}
