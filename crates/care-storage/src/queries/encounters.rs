//! Queries for `emr_encounter`.

use care_core::errors::StorageError;
use chrono::Utc;
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{to_db_time, uuid_param};

/// Insert an encounter with empty blobs. Returns the row id.
pub fn insert_encounter(
    conn: &Connection,
    status: &str,
    encounter_class: &str,
    created_by: Option<i64>,
) -> Result<i64, StorageError> {
    let now = to_db_time(&Utc::now());
    conn.execute(
        "INSERT INTO emr_encounter (
            external_id, created_date, modified_date, deleted, history, meta,
            status, encounter_class, period, priority, created_by_id, updated_by_id
         ) VALUES (?1, ?2, ?2, 0, '{}', '{}', ?3, ?4, '{}', 'routine', ?5, ?5)",
        params![uuid_param(&Uuid::new_v4()), now, status, encounter_class, created_by],
    )
    .map_err(StorageError::sqlite)?;
    Ok(conn.last_insert_rowid())
}

/// Hard-delete an encounter; consents owned by it go with it.
/// Returns whether a row was removed.
pub fn delete_encounter(conn: &Connection, id: i64) -> Result<bool, StorageError> {
    let removed = conn
        .execute("DELETE FROM emr_encounter WHERE id = ?1", params![id])
        .map_err(StorageError::sqlite)?;
    if removed > 0 {
        tracing::debug!(encounter_id = id, "deleted encounter");
    }
    Ok(removed > 0)
}
