//! Error types for account services.

use empire_db::DbError;
use empire_types::FieldError;
use thiserror::Error;

/// Errors from report and moderation operations.
///
/// Benign outcomes (unknown device, account without rows) are not errors;
/// they read as zero / false.
#[derive(Debug, Error)]
pub enum AccountError {
    /// A required input was missing.
    #[error(transparent)]
    Validation(#[from] FieldError),

    /// Store error.
    #[error(transparent)]
    Database(#[from] DbError),
}

impl From<rusqlite::Error> for AccountError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(e.into())
    }
}

impl AccountError {
    /// Stable wire code for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(e) => e.code(),
            Self::Database(_) => "server_error",
        }
    }
}

/// Result type for account operations.
pub type AccountResult<T> = Result<T, AccountError>;
