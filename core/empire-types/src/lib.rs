//! Core type definitions for the Empire Run backoffice.
//!
//! This crate defines the small, domain-agnostic values shared by every
//! service crate:
//! - Account identity (`AccountRef`): a normalized email plus a username
//! - Input normalization helpers
//! - The field validation error returned before any state is touched
//!
//! Anything that owns a table lives in its own crate, not here.

mod account;

pub use account::{normalize_email, required, AccountRef};

/// Result type alias for input validation.
pub type FieldResult<T> = std::result::Result<T, FieldError>;

/// A required input field was missing or blank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("missing required field: {field}")]
pub struct FieldError {
    /// Wire name of the offending field (e.g. `email`, `deviceId`).
    pub field: &'static str,
}

impl FieldError {
    #[must_use]
    pub const fn missing(field: &'static str) -> Self {
        Self { field }
    }

    /// Stable error code, e.g. `missing_email`.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self.field {
            "email" => "missing_email",
            "username" => "missing_username",
            "deviceId" => "missing_device_id",
            "orderCode" => "missing_order_code",
            "id" => "missing_id",
            "key" => "missing_key",
            "achievementKey" => "missing_achievement_key",
            "saveJson" => "missing_save_json",
            "isBanned" => "missing_is_banned",
            _ => "missing_field",
        }
    }
}
