//! Error types for outbound mail.

use thiserror::Error;

/// Result type for mail operations.
pub type MailResult<T> = Result<T, MailError>;

/// Errors that can occur while sending mail.
#[derive(Debug, Error)]
pub enum MailError {
    /// The request never reached the provider (DNS, TLS, connect, ...).
    #[error("mail transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("mail provider rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },

    /// The recipient address is unusable.
    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),

    /// The sender is misconfigured.
    #[error("invalid mail configuration: {0}")]
    Config(String),
}
