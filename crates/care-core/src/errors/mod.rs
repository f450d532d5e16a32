//! Error handling for care.
//! One error enum per subsystem, `thiserror` only, zero `anyhow`.

pub mod config_error;
pub mod error_code;
pub mod migration_error;
pub mod storage_error;

pub use config_error::ConfigError;
pub use error_code::CareErrorCode;
pub use migration_error::MigrationError;
pub use storage_error::StorageError;
