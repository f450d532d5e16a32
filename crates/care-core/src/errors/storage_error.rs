//! Storage-layer errors for SQLite operations.

use super::error_code::{self, CareErrorCode};

/// Errors raised by connections and row-level queries.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("SQLite error: {message}")]
    SqliteError { message: String },

    #[error("Database busy")]
    DbBusy,

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
}

impl StorageError {
    /// Wrap any displayable SQLite failure.
    pub fn sqlite(message: impl std::fmt::Display) -> Self {
        Self::SqliteError {
            message: message.to_string(),
        }
    }
}

impl CareErrorCode for StorageError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::SqliteError { .. } => error_code::STORAGE_ERROR,
            Self::DbBusy => error_code::DB_BUSY,
            Self::InvalidValue { .. } => error_code::INVALID_VALUE,
            Self::NotFound { .. } => error_code::NOT_FOUND,
        }
    }
}
