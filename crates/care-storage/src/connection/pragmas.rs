//! PRAGMA configuration applied to every SQLite connection.
//!
//! WAL mode, NORMAL sync, foreign_keys ON, configurable busy_timeout.

use care_core::errors::StorageError;
use rusqlite::Connection;

/// Apply safety pragmas to a connection.
pub fn apply_pragmas(conn: &Connection, busy_timeout_ms: u64) -> Result<(), StorageError> {
    conn.execute_batch(&format!(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA busy_timeout = {busy_timeout_ms};
        "
    ))
    .map_err(|e| StorageError::SqliteError {
        message: format!("failed to apply pragmas: {e}"),
    })
}

/// Whether foreign key enforcement is on for this connection.
pub fn foreign_keys_enabled(conn: &Connection) -> Result<bool, StorageError> {
    conn.pragma_query_value(None, "foreign_keys", |row| row.get::<_, i64>(0))
        .map(|v| v != 0)
        .map_err(StorageError::sqlite)
}

/// Toggle foreign key enforcement. Has no effect inside a transaction.
pub fn set_foreign_keys(conn: &Connection, enabled: bool) -> Result<(), StorageError> {
    conn.pragma_update(None, "foreign_keys", enabled)
        .map_err(StorageError::sqlite)
}
