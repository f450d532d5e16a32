//! Migration errors.
//!
//! All of these are fatal: the executor never retries or partially applies a
//! migration, it rolls back and hands the error to the operator as-is.

use super::error_code::{self, CareErrorCode};
use super::StorageError;

/// Errors raised while planning, applying, or reverting migrations.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("Migration {migration} depends on {dependency}, which is not applied")]
    DependencyNotSatisfied { migration: String, dependency: String },

    #[error("Unknown migration: {migration}")]
    UnknownMigration { migration: String },

    #[error("Circular dependency detected at {migration}")]
    CircularDependency { migration: String },

    #[error("Table already exists: {table}")]
    TableAlreadyExists { table: String },

    #[error("Model not found in schema state: {model}")]
    ModelNotFound { model: String },

    #[error("Field {field} not found on model {model}")]
    FieldNotFound { model: String, field: String },

    #[error("Cannot revert {migration}: still required by applied {dependents}")]
    DependentsStillApplied { migration: String, dependents: String },

    #[error("Migration {migration} is not applied")]
    NotApplied { migration: String },

    #[error("DDL failed in {migration}: {message}")]
    DdlFailed { migration: String, message: String },

    #[error("Migration cancelled")]
    Cancelled,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl CareErrorCode for MigrationError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::DependencyNotSatisfied { .. } => error_code::DEPENDENCY_NOT_SATISFIED,
            Self::UnknownMigration { .. } => error_code::UNKNOWN_MIGRATION,
            Self::CircularDependency { .. } => error_code::CIRCULAR_DEPENDENCY,
            Self::TableAlreadyExists { .. } => error_code::TABLE_ALREADY_EXISTS,
            Self::ModelNotFound { .. } | Self::FieldNotFound { .. } => {
                error_code::SCHEMA_MISMATCH
            }
            Self::DependentsStillApplied { .. } => error_code::DEPENDENTS_APPLIED,
            Self::NotApplied { .. } => error_code::NOT_APPLIED,
            Self::DdlFailed { .. } => error_code::DDL_FAILED,
            Self::Cancelled => error_code::CANCELLED,
            Self::Storage(e) => e.error_code(),
        }
    }
}
