//! Queries for `emr_device` and `emr_deviceservicehistory`.

use care_core::errors::StorageError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{json_col, opt_time_col, to_db_time, uuid_col, uuid_param};

/// A device service history record.
#[derive(Debug, Clone)]
pub struct ServiceHistoryRow {
    pub id: i64,
    pub external_id: Uuid,
    pub device_id: i64,
    pub serviced_on: Option<DateTime<Utc>>,
    pub note: String,
    pub edit_history: serde_json::Value,
}

pub fn insert_device(conn: &Connection, registered_name: &str) -> Result<i64, StorageError> {
    let now = to_db_time(&Utc::now());
    conn.execute(
        "INSERT INTO emr_device (
            external_id, created_date, modified_date, deleted, history, meta,
            registered_name, status, metadata
         ) VALUES (?1, ?2, ?2, 0, '{}', '{}', ?3, 'active', '{}')",
        params![uuid_param(&Uuid::new_v4()), now, registered_name],
    )
    .map_err(StorageError::sqlite)?;
    Ok(conn.last_insert_rowid())
}

/// Insert a service record. `serviced_on` may only be absent once the
/// column has been relaxed to nullable.
pub fn insert_service_history(
    conn: &Connection,
    device_id: i64,
    serviced_on: Option<DateTime<Utc>>,
    note: &str,
) -> Result<i64, StorageError> {
    let now = to_db_time(&Utc::now());
    conn.execute(
        "INSERT INTO emr_deviceservicehistory (
            external_id, created_date, modified_date, deleted, history, meta,
            serviced_on, note, edit_history, device_id
         ) VALUES (?1, ?2, ?2, 0, '{}', '{}', ?3, ?4, '[]', ?5)",
        params![
            uuid_param(&Uuid::new_v4()),
            now,
            serviced_on.as_ref().map(to_db_time),
            note,
            device_id
        ],
    )
    .map_err(StorageError::sqlite)?;
    Ok(conn.last_insert_rowid())
}

pub fn get_service_history(
    conn: &Connection,
    id: i64,
) -> Result<Option<ServiceHistoryRow>, StorageError> {
    conn.query_row(
        "SELECT id, external_id, device_id, serviced_on, note, edit_history
         FROM emr_deviceservicehistory WHERE id = ?1",
        params![id],
        |row| {
            Ok(ServiceHistoryRow {
                id: row.get(0)?,
                external_id: uuid_col(row, 1)?,
                device_id: row.get(2)?,
                serviced_on: opt_time_col(row, 3)?,
                note: row.get(4)?,
                edit_history: json_col(row, 5)?,
            })
        },
    )
    .optional()
    .map_err(StorageError::sqlite)
}
