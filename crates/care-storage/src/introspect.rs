//! Live schema introspection via SQLite pragmas.

use care_core::errors::StorageError;
use rusqlite::{params, Connection};

/// One column as reported by `PRAGMA table_info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub decl_type: String,
    pub not_null: bool,
    pub primary_key: bool,
}

/// One foreign key as reported by `PRAGMA foreign_key_list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyInfo {
    pub column: String,
    pub target_table: String,
    pub target_column: String,
    pub on_delete: String,
}

/// One index as reported by `PRAGMA index_list` / `index_info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexInfo {
    pub name: String,
    pub unique: bool,
    pub columns: Vec<String>,
}

pub fn table_exists(conn: &Connection, table: &str) -> Result<bool, StorageError> {
    conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        params![table],
        |row| row.get::<_, i64>(0),
    )
    .map(|n| n > 0)
    .map_err(StorageError::sqlite)
}

/// User tables, sorted by name.
pub fn table_names(conn: &Connection) -> Result<Vec<String>, StorageError> {
    let mut stmt = conn
        .prepare(
            "SELECT name FROM sqlite_master
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
             ORDER BY name",
        )
        .map_err(StorageError::sqlite)?;
    let rows = stmt
        .query_map([], |row| row.get(0))
        .map_err(StorageError::sqlite)?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(StorageError::sqlite)
}

pub fn columns(conn: &Connection, table: &str) -> Result<Vec<ColumnInfo>, StorageError> {
    let mut stmt = conn
        .prepare("SELECT name, type, \"notnull\", pk FROM pragma_table_info(?1) ORDER BY cid")
        .map_err(StorageError::sqlite)?;
    let rows = stmt
        .query_map(params![table], |row| {
            Ok(ColumnInfo {
                name: row.get(0)?,
                decl_type: row.get(1)?,
                not_null: row.get::<_, i64>(2)? != 0,
                primary_key: row.get::<_, i64>(3)? != 0,
            })
        })
        .map_err(StorageError::sqlite)?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(StorageError::sqlite)
}

pub fn foreign_keys(conn: &Connection, table: &str) -> Result<Vec<ForeignKeyInfo>, StorageError> {
    let mut stmt = conn
        .prepare(
            "SELECT \"from\", \"table\", \"to\", on_delete
             FROM pragma_foreign_key_list(?1) ORDER BY \"from\"",
        )
        .map_err(StorageError::sqlite)?;
    let rows = stmt
        .query_map(params![table], |row| {
            Ok(ForeignKeyInfo {
                column: row.get(0)?,
                target_table: row.get(1)?,
                target_column: row.get(2)?,
                on_delete: row.get(3)?,
            })
        })
        .map_err(StorageError::sqlite)?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(StorageError::sqlite)
}

pub fn indexes(conn: &Connection, table: &str) -> Result<Vec<IndexInfo>, StorageError> {
    let mut stmt = conn
        .prepare("SELECT name, \"unique\" FROM pragma_index_list(?1) ORDER BY name")
        .map_err(StorageError::sqlite)?;
    let listed = stmt
        .query_map(params![table], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? != 0))
        })
        .map_err(StorageError::sqlite)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(StorageError::sqlite)?;

    let mut info_stmt = conn
        .prepare("SELECT name FROM pragma_index_info(?1) ORDER BY seqno")
        .map_err(StorageError::sqlite)?;
    let mut out = Vec::with_capacity(listed.len());
    for (name, unique) in listed {
        let columns = info_stmt
            .query_map(params![name], |row| row.get(0))
            .map_err(StorageError::sqlite)?
            .collect::<Result<Vec<String>, _>>()
            .map_err(StorageError::sqlite)?;
        out.push(IndexInfo {
            name,
            unique,
            columns,
        });
    }
    Ok(out)
}

/// Violations reported by `PRAGMA foreign_key_check`, formatted for operators.
pub fn foreign_key_violations(conn: &Connection) -> Result<Vec<String>, StorageError> {
    let mut stmt = conn
        .prepare("SELECT \"table\", rowid, parent FROM pragma_foreign_key_check")
        .map_err(StorageError::sqlite)?;
    let rows = stmt
        .query_map([], |row| {
            let table: String = row.get(0)?;
            let rowid: Option<i64> = row.get(1)?;
            let parent: String = row.get(2)?;
            Ok(match rowid {
                Some(id) => format!("{table} row {id} references missing {parent} row"),
                None => format!("{table} references missing {parent} row"),
            })
        })
        .map_err(StorageError::sqlite)?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(StorageError::sqlite)
}
