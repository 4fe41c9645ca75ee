//! Error types for the licensing module.

use empire_db::DbError;
use empire_types::FieldError;
use thiserror::Error;

/// Licensing-specific errors.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// A required input was missing.
    #[error(transparent)]
    Validation(#[from] FieldError),

    /// Order amount is negative.
    #[error("invalid order amount: {0}")]
    InvalidAmount(i64),

    /// Another order already uses this order code.
    #[error("order code already exists: {0}")]
    OrderCodeExists(String),

    /// No order with this id.
    #[error("order not found: {0}")]
    OrderNotFound(i64),

    /// Cancel target is missing or already paid.
    #[error("order {0} not found or not pending")]
    OrderNotFoundOrNotPending(i64),

    /// Another approval of this order is delivering its key right now.
    #[error("approval of order {0} is already in progress")]
    ApprovalInProgress(i64),

    /// Every candidate key collided with an existing one.
    #[error("failed_to_generate_unique_key: gave up after {attempts} attempts")]
    KeyGenerationExhausted { attempts: usize },

    /// The order's recorded key is owned by a different order.
    #[error("license key {key} belongs to another order")]
    KeyConflict { key: String },

    /// The license email could not be delivered; nothing was persisted.
    #[error("license email delivery failed: {0}")]
    MailFailed(String),

    /// Store error.
    #[error(transparent)]
    Database(#[from] DbError),
}

impl From<rusqlite::Error> for LicenseError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(e.into())
    }
}

impl LicenseError {
    /// Stable wire code for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(e) => e.code(),
            Self::InvalidAmount(_) => "invalid_amount",
            Self::OrderCodeExists(_) => "order_code_exists",
            Self::OrderNotFound(_) => "order_not_found",
            Self::OrderNotFoundOrNotPending(_) => "order_not_found_or_not_pending",
            Self::ApprovalInProgress(_) => "approval_in_progress",
            Self::MailFailed(_) => "mail_failed",
            Self::KeyGenerationExhausted { .. } | Self::KeyConflict { .. } | Self::Database(_) => {
                "server_error"
            }
        }
    }
}

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;
