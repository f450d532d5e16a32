//! Persisted migration state: which migrations are applied, and in what order.

use std::collections::BTreeSet;

use care_core::constants::MIGRATIONS_TABLE;
use care_core::errors::StorageError;
use chrono::Utc;
use rusqlite::{params, Connection};

use super::MigrationKey;
use crate::introspect;

/// One row of the applied-migrations table.
#[derive(Debug, Clone)]
pub struct AppliedMigration {
    pub id: i64,
    pub key: MigrationKey,
    pub applied: String,
}

/// Create the applied-migrations table if it does not exist yet.
pub fn ensure_schema(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {MIGRATIONS_TABLE} (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            app TEXT NOT NULL,
            name TEXT NOT NULL,
            applied TEXT NOT NULL,
            UNIQUE(app, name)
        );"
    ))
    .map_err(StorageError::sqlite)
}

/// Applied migrations in application order. Empty if the table is missing.
pub fn applied_migrations(conn: &Connection) -> Result<Vec<AppliedMigration>, StorageError> {
    if !introspect::table_exists(conn, MIGRATIONS_TABLE)? {
        return Ok(Vec::new());
    }
    let mut stmt = conn
        .prepare(&format!(
            "SELECT id, app, name, applied FROM {MIGRATIONS_TABLE} ORDER BY id"
        ))
        .map_err(StorageError::sqlite)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(AppliedMigration {
                id: row.get(0)?,
                key: MigrationKey {
                    app_label: row.get(1)?,
                    name: row.get(2)?,
                },
                applied: row.get(3)?,
            })
        })
        .map_err(StorageError::sqlite)?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(StorageError::sqlite)
}

pub fn applied_keys(conn: &Connection) -> Result<BTreeSet<MigrationKey>, StorageError> {
    Ok(applied_migrations(conn)?
        .into_iter()
        .map(|m| m.key)
        .collect())
}

pub fn record_applied(conn: &Connection, key: &MigrationKey) -> Result<(), StorageError> {
    conn.execute(
        &format!("INSERT INTO {MIGRATIONS_TABLE} (app, name, applied) VALUES (?1, ?2, ?3)"),
        params![key.app_label, key.name, Utc::now().to_rfc3339()],
    )
    .map_err(StorageError::sqlite)?;
    Ok(())
}

/// Remove the record of `key`. Returns whether a row was removed.
pub fn record_unapplied(conn: &Connection, key: &MigrationKey) -> Result<bool, StorageError> {
    let removed = conn
        .execute(
            &format!("DELETE FROM {MIGRATIONS_TABLE} WHERE app = ?1 AND name = ?2"),
            params![key.app_label, key.name],
        )
        .map_err(StorageError::sqlite)?;
    Ok(removed > 0)
}
