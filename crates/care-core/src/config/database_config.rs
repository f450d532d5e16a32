//! Database configuration.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_BUSY_TIMEOUT_MS, DEFAULT_DATABASE_PATH};

/// Configuration for the SQLite database the migrator operates on.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to the SQLite file. Default: "care.db".
    pub path: Option<String>,
    /// Milliseconds to wait on a locked database. Default: 5000.
    pub busy_timeout_ms: Option<u64>,
}

impl DatabaseConfig {
    /// Returns the effective database path, defaulting to "care.db".
    pub fn effective_path(&self) -> &str {
        self.path.as_deref().unwrap_or(DEFAULT_DATABASE_PATH)
    }

    /// Returns the effective busy timeout, defaulting to 5000ms.
    pub fn effective_busy_timeout_ms(&self) -> u64 {
        self.busy_timeout_ms.unwrap_or(DEFAULT_BUSY_TIMEOUT_MS)
    }
}
