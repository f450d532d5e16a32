//! Connection management: a single serialized writer connection.
//!
//! Schema changes and row writes share the one writer, so two migrations
//! can never run against the same database handle at once.

pub mod pragmas;

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use care_core::config::DatabaseConfig;
use care_core::constants::DEFAULT_BUSY_TIMEOUT_MS;
use care_core::errors::StorageError;
use rusqlite::{Connection, ErrorCode};

use self::pragmas::apply_pragmas;

/// Owns the writer connection.
pub struct DatabaseManager {
    writer: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl DatabaseManager {
    /// Open a database at the given path and apply pragmas.
    /// Migrations are not run; that is an explicit operator action.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT_MS)
    }

    /// Open the database described by `config`.
    pub fn from_config(config: &DatabaseConfig) -> Result<Self, StorageError> {
        Self::open_with_timeout(
            Path::new(config.effective_path()),
            config.effective_busy_timeout_ms(),
        )
    }

    fn open_with_timeout(path: &Path, busy_timeout_ms: u64) -> Result<Self, StorageError> {
        let writer = Connection::open(path).map_err(map_sqlite_error)?;
        apply_pragmas(&writer, busy_timeout_ms)?;
        tracing::debug!(path = %path.display(), "opened database");
        Ok(Self {
            writer: Mutex::new(writer),
            path: Some(path.to_path_buf()),
        })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let writer = Connection::open_in_memory().map_err(map_sqlite_error)?;
        apply_pragmas(&writer, DEFAULT_BUSY_TIMEOUT_MS)?;
        Ok(Self {
            writer: Mutex::new(writer),
            path: None,
        })
    }

    /// Execute an operation with the serialized writer connection.
    pub fn with_writer<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Connection) -> Result<T, E>,
        E: From<StorageError>,
    {
        let guard = self.writer.lock().map_err(|_| StorageError::SqliteError {
            message: "write lock poisoned".to_string(),
        })?;
        f(&guard)
    }

    /// Get the database file path (None for in-memory).
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

/// Convert a rusqlite error, singling out lock contention.
pub fn map_sqlite_error(e: rusqlite::Error) -> StorageError {
    match e.sqlite_error_code() {
        Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => StorageError::DbBusy,
        _ => StorageError::sqlite(e),
    }
}
