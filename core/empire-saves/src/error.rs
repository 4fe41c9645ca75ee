use empire_db::DbError;
use empire_types::FieldError;
use thiserror::Error;

/// Cloud save errors.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error(transparent)]
    Validation(#[from] FieldError),

    #[error("save not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Database(#[from] DbError),
}

impl From<rusqlite::Error> for SaveError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(e.into())
    }
}

impl SaveError {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(e) => e.code(),
            Self::NotFound(_) => "not_found",
            Self::Database(_) => "server_error",
        }
    }
}

pub type SaveResult<T> = Result<T, SaveError>;
