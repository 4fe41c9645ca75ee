//! Player account identity.
//!
//! A player account is addressed by the purchasing email plus the in-game
//! username; one email may own several usernames.

use crate::{FieldError, FieldResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalizes an email address: surrounding whitespace removed, lower-cased.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Returns the trimmed value, or a [`FieldError`] naming `field` when the
/// value is absent or blank.
pub fn required<'a>(value: Option<&'a str>, field: &'static str) -> FieldResult<&'a str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(FieldError::missing(field)),
    }
}

/// Identity of one player account: `(email, username)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountRef {
    email: String,
    username: String,
}

impl AccountRef {
    /// Builds an account reference, normalizing the email and trimming the
    /// username.
    ///
    /// # Errors
    ///
    /// Returns a [`FieldError`] if either part is blank.
    pub fn new(email: &str, username: &str) -> FieldResult<Self> {
        let email = normalize_email(required(Some(email), "email")?);
        let username = required(Some(username), "username")?.to_string();
        Ok(Self { email, username })
    }

    /// Returns the normalized email.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Returns the username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }
}

impl fmt::Display for AccountRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.email, self.username)
    }
}
