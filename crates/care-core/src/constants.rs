//! Shared constants for the care schema engine.

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Project configuration file name.
pub const PROJECT_CONFIG_FILE: &str = "care.toml";

/// Default SQLite database path.
pub const DEFAULT_DATABASE_PATH: &str = "care.db";

/// Default busy timeout for the writer connection.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

/// Default swappable user model.
pub const DEFAULT_AUTH_USER_MODEL: &str = "auth.User";

/// Table recording applied migrations.
pub const MIGRATIONS_TABLE: &str = "care_migrations";

/// Environment variable holding the log filter.
pub const LOG_ENV_VAR: &str = "CARE_LOG";
