//! CareErrorCode trait for operator-facing error reporting.

/// Every error enum implements this to expose a stable code string that
/// scripts wrapping the migrator can match on.
pub trait CareErrorCode {
    /// Returns the error code string (e.g., "DEPENDENCY_NOT_SATISFIED").
    fn error_code(&self) -> &'static str;

    /// Returns the formatted operator string: `[ERROR_CODE] message`.
    fn operator_string(&self) -> String
    where
        Self: std::fmt::Display,
    {
        format!("[{}] {}", self.error_code(), self)
    }
}

pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
pub const DB_BUSY: &str = "DB_BUSY";
pub const INVALID_VALUE: &str = "INVALID_VALUE";
pub const NOT_FOUND: &str = "NOT_FOUND";
pub const DEPENDENCY_NOT_SATISFIED: &str = "DEPENDENCY_NOT_SATISFIED";
pub const UNKNOWN_MIGRATION: &str = "UNKNOWN_MIGRATION";
pub const CIRCULAR_DEPENDENCY: &str = "CIRCULAR_DEPENDENCY";
pub const TABLE_ALREADY_EXISTS: &str = "TABLE_ALREADY_EXISTS";
pub const SCHEMA_MISMATCH: &str = "SCHEMA_MISMATCH";
pub const DEPENDENTS_APPLIED: &str = "DEPENDENTS_APPLIED";
pub const NOT_APPLIED: &str = "NOT_APPLIED";
pub const DDL_FAILED: &str = "DDL_FAILED";
pub const CANCELLED: &str = "CANCELLED";
