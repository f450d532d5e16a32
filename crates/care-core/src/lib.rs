//! care-core: errors, configuration, tracing, and shared constants for the
//! care schema engine.

pub mod config;
pub mod constants;
pub mod errors;
pub mod tracing;
pub mod traits;

pub use config::CareConfig;
pub use errors::{ConfigError, MigrationError, StorageError};
pub use traits::cancellation::{Cancellable, CancellationToken};
