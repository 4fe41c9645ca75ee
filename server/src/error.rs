//! Mapping of service errors onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use empire_accounts::AccountError;
use empire_license::LicenseError;
use empire_saves::SaveError;
use empire_types::FieldError;
use serde_json::json;

/// An error response: `{"success": false, "error": <code>, "message": <text>}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    pub fn unauthorized(code: &'static str) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, code, "admin credential required")
    }

    pub fn not_found(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, code, message)
    }

    /// Logs `source` and hides it from the client.
    fn internal(source: &dyn std::error::Error) -> Self {
        tracing::error!("Request failed: {}", source);
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "server_error",
            "internal server error",
        )
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "success": false,
            "error": self.code,
            "message": self.message,
        });
        (self.status, Json(body)).into_response()
    }
}

impl From<FieldError> for ApiError {
    fn from(e: FieldError) -> Self {
        Self::bad_request(e.code(), e.to_string())
    }
}

impl From<LicenseError> for ApiError {
    fn from(e: LicenseError) -> Self {
        let status = match &e {
            LicenseError::Validation(_) | LicenseError::InvalidAmount(_) => StatusCode::BAD_REQUEST,
            LicenseError::OrderNotFound(_) => StatusCode::NOT_FOUND,
            LicenseError::OrderCodeExists(_)
            | LicenseError::OrderNotFoundOrNotPending(_)
            | LicenseError::ApprovalInProgress(_) => StatusCode::CONFLICT,
            LicenseError::MailFailed(_) => StatusCode::BAD_GATEWAY,
            LicenseError::KeyGenerationExhausted { .. }
            | LicenseError::KeyConflict { .. }
            | LicenseError::Database(_) => return Self::internal(&e),
        };
        Self::new(status, e.code(), e.to_string())
    }
}

impl From<AccountError> for ApiError {
    fn from(e: AccountError) -> Self {
        match &e {
            AccountError::Validation(field) => (*field).into(),
            AccountError::Database(_) => Self::internal(&e),
        }
    }
}

impl From<SaveError> for ApiError {
    fn from(e: SaveError) -> Self {
        match &e {
            SaveError::Validation(field) => (*field).into(),
            SaveError::NotFound(_) => Self::not_found(e.code(), "save not found"),
            SaveError::Database(_) => Self::internal(&e),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
