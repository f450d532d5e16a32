//! Queries for `auth_user`, the default user model table.

use care_core::errors::StorageError;
use chrono::Utc;
use rusqlite::{params, Connection};

use super::to_db_time;

/// Insert an active user. Returns the row id.
pub fn insert_user(conn: &Connection, username: &str, email: &str) -> Result<i64, StorageError> {
    conn.execute(
        "INSERT INTO auth_user (password, last_login, username, email, is_active, date_joined)
         VALUES ('', NULL, ?1, ?2, 1, ?3)",
        params![username, email, to_db_time(&Utc::now())],
    )
    .map_err(StorageError::sqlite)?;
    Ok(conn.last_insert_rowid())
}

/// Delete a user. References held by audit columns are cleared by the
/// database. Returns whether a row was removed.
pub fn delete_user(conn: &Connection, id: i64) -> Result<bool, StorageError> {
    let removed = conn
        .execute("DELETE FROM auth_user WHERE id = ?1", params![id])
        .map_err(StorageError::sqlite)?;
    Ok(removed > 0)
}

pub fn count(conn: &Connection) -> Result<i64, StorageError> {
    conn.query_row("SELECT COUNT(*) FROM auth_user", [], |row| row.get(0))
        .map_err(StorageError::sqlite)
}
