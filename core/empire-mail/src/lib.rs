//! Outbound email for the Empire Run backoffice.
//!
//! Services depend only on the [`EmailSender`] trait. Two implementations
//! ship here:
//! - [`HttpMailer`] posts to a transactional mail provider's JSON API
//! - [`LogMailer`] just logs, for development without a provider
//!
//! Templates for the mails the backoffice sends live in [`template`].

mod error;
mod http;
mod sender;
pub mod template;

pub use error::{MailError, MailResult};
pub use http::{HttpMailer, HttpMailerConfig};
pub use sender::{EmailMessage, EmailSender, LogMailer};
pub use template::license_key_email;
