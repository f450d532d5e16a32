//! Configuration system for care.
//! TOML-based, layered resolution: CLI > env > project > user > defaults.

pub mod care_config;
pub mod database_config;
pub mod migration_config;

pub use care_config::{CareConfig, CliOverrides};
pub use database_config::DatabaseConfig;
pub use migration_config::MigrationConfig;
