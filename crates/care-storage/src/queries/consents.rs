//! Queries for `emr_consent`, consent decisions recorded against an encounter.
//!
//! Rows are addressed by `external_id`; the sequential `id` never leaves
//! this module's callers. Deletion is soft (`deleted = 1`); a consent is
//! only physically removed when its encounter is deleted.

use care_core::errors::StorageError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::{json_col, opt_time_col, time_col, to_db_time, uuid_col, uuid_param};

pub const STATUS_MAX_LEN: usize = 50;
pub const CATEGORY_MAX_LEN: usize = 50;
pub const DECISION_MAX_LEN: usize = 10;

const SELECT_COLUMNS: &str = "id, external_id, created_date, modified_date, deleted, history, meta,
    status, category, date, period, decision, verification_details,
    created_by_id, encounter_id, updated_by_id";

/// A consent record.
#[derive(Debug, Clone, Serialize)]
pub struct ConsentRow {
    #[serde(skip)]
    pub id: i64,
    pub external_id: Uuid,
    pub created_date: Option<DateTime<Utc>>,
    pub modified_date: Option<DateTime<Utc>>,
    pub deleted: bool,
    pub history: Value,
    pub meta: Value,
    pub status: String,
    pub category: String,
    pub date: DateTime<Utc>,
    pub period: Value,
    pub decision: String,
    pub verification_details: Value,
    pub created_by_id: Option<i64>,
    pub encounter_id: i64,
    pub updated_by_id: Option<i64>,
}

/// Values for a new consent. Blobs left unset take their empty defaults.
#[derive(Debug, Clone)]
pub struct NewConsent {
    pub encounter_id: i64,
    pub date: DateTime<Utc>,
    pub status: String,
    pub category: String,
    pub decision: String,
    pub period: Option<Value>,
    pub meta: Option<Value>,
    pub verification_details: Option<Value>,
    pub created_by: Option<i64>,
}

impl NewConsent {
    pub fn new(
        encounter_id: i64,
        date: DateTime<Utc>,
        status: &str,
        category: &str,
        decision: &str,
    ) -> Self {
        Self {
            encounter_id,
            date,
            status: status.to_string(),
            category: category.to_string(),
            decision: decision.to_string(),
            period: None,
            meta: None,
            verification_details: None,
            created_by: None,
        }
    }

    pub fn period(mut self, period: Value) -> Self {
        self.period = Some(period);
        self
    }

    pub fn meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn verification_details(mut self, details: Value) -> Self {
        self.verification_details = Some(details);
        self
    }

    pub fn created_by(mut self, user_id: i64) -> Self {
        self.created_by = Some(user_id);
        self
    }
}

/// Partial update. `None` leaves a column unchanged.
#[derive(Debug, Clone, Default)]
pub struct ConsentUpdate {
    pub status: Option<String>,
    pub category: Option<String>,
    pub decision: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub period: Option<Value>,
    pub meta: Option<Value>,
    pub verification_details: Option<Value>,
}

fn check_len(field: &str, value: &str, max: usize) -> Result<(), StorageError> {
    let len = value.chars().count();
    if len > max {
        return Err(StorageError::InvalidValue {
            field: field.to_string(),
            message: format!("at most {max} characters allowed, got {len}"),
        });
    }
    Ok(())
}

fn encode(field: &str, value: &Value) -> Result<String, StorageError> {
    serde_json::to_string(value).map_err(|e| StorageError::InvalidValue {
        field: field.to_string(),
        message: e.to_string(),
    })
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<ConsentRow> {
    Ok(ConsentRow {
        id: row.get(0)?,
        external_id: uuid_col(row, 1)?,
        created_date: opt_time_col(row, 2)?,
        modified_date: opt_time_col(row, 3)?,
        deleted: row.get(4)?,
        history: json_col(row, 5)?,
        meta: json_col(row, 6)?,
        status: row.get(7)?,
        category: row.get(8)?,
        date: time_col(row, 9)?,
        period: json_col(row, 10)?,
        decision: row.get(11)?,
        verification_details: json_col(row, 12)?,
        created_by_id: row.get(13)?,
        encounter_id: row.get(14)?,
        updated_by_id: row.get(15)?,
    })
}

/// Insert a consent, generating its `external_id` and timestamps.
pub fn insert_consent(conn: &Connection, new: &NewConsent) -> Result<ConsentRow, StorageError> {
    check_len("status", &new.status, STATUS_MAX_LEN)?;
    check_len("category", &new.category, CATEGORY_MAX_LEN)?;
    check_len("decision", &new.decision, DECISION_MAX_LEN)?;

    let external_id = Uuid::new_v4();
    let now = to_db_time(&Utc::now());
    let empty_object = json!({});
    let period = encode("period", new.period.as_ref().unwrap_or(&empty_object))?;
    let meta = encode("meta", new.meta.as_ref().unwrap_or(&empty_object))?;
    let verification = encode(
        "verification_details",
        new.verification_details.as_ref().unwrap_or(&json!([])),
    )?;

    conn.execute(
        "INSERT INTO emr_consent (
            external_id, created_date, modified_date, deleted, history, meta,
            status, category, date, period, decision, verification_details,
            created_by_id, encounter_id, updated_by_id
         ) VALUES (?1, ?2, ?2, 0, '{}', ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?10)",
        params![
            uuid_param(&external_id),
            now,
            meta,
            new.status,
            new.category,
            to_db_time(&new.date),
            period,
            new.decision,
            verification,
            new.created_by,
            new.encounter_id,
        ],
    )
    .map_err(StorageError::sqlite)?;

    tracing::debug!(%external_id, encounter_id = new.encounter_id, "inserted consent");
    get_consent(conn, &external_id)?.ok_or_else(|| StorageError::NotFound {
        entity: "consent",
        id: external_id.to_string(),
    })
}

/// Fetch a consent by external id, including soft-deleted ones.
pub fn get_consent(conn: &Connection, external_id: &Uuid) -> Result<Option<ConsentRow>, StorageError> {
    conn.query_row(
        &format!("SELECT {SELECT_COLUMNS} FROM emr_consent WHERE external_id = ?1"),
        params![uuid_param(external_id)],
        map_row,
    )
    .optional()
    .map_err(StorageError::sqlite)
}

/// Live consents of an encounter, oldest consent date first.
pub fn list_for_encounter(
    conn: &Connection,
    encounter_id: i64,
) -> Result<Vec<ConsentRow>, StorageError> {
    let mut stmt = conn
        .prepare_cached(&format!(
            "SELECT {SELECT_COLUMNS} FROM emr_consent
             WHERE encounter_id = ?1 AND deleted = 0
             ORDER BY date, id"
        ))
        .map_err(StorageError::sqlite)?;
    let rows = stmt
        .query_map(params![encounter_id], map_row)
        .map_err(StorageError::sqlite)?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(StorageError::sqlite)
}

/// Apply a partial update to a live consent and touch `modified_date`.
pub fn update_consent(
    conn: &Connection,
    external_id: &Uuid,
    update: &ConsentUpdate,
    updated_by: Option<i64>,
) -> Result<ConsentRow, StorageError> {
    let current = get_consent(conn, external_id)?
        .filter(|c| !c.deleted)
        .ok_or_else(|| StorageError::NotFound {
            entity: "consent",
            id: external_id.to_string(),
        })?;

    let status = update.status.as_deref().unwrap_or(&current.status);
    let category = update.category.as_deref().unwrap_or(&current.category);
    let decision = update.decision.as_deref().unwrap_or(&current.decision);
    check_len("status", status, STATUS_MAX_LEN)?;
    check_len("category", category, CATEGORY_MAX_LEN)?;
    check_len("decision", decision, DECISION_MAX_LEN)?;

    let date = update.date.unwrap_or(current.date);
    let period = encode("period", update.period.as_ref().unwrap_or(&current.period))?;
    let meta = encode("meta", update.meta.as_ref().unwrap_or(&current.meta))?;
    let verification = encode(
        "verification_details",
        update
            .verification_details
            .as_ref()
            .unwrap_or(&current.verification_details),
    )?;

    conn.execute(
        "UPDATE emr_consent SET
            status = ?1, category = ?2, decision = ?3, date = ?4, period = ?5,
            meta = ?6, verification_details = ?7, updated_by_id = ?8, modified_date = ?9
         WHERE id = ?10",
        params![
            status,
            category,
            decision,
            to_db_time(&date),
            period,
            meta,
            verification,
            updated_by,
            to_db_time(&Utc::now()),
            current.id,
        ],
    )
    .map_err(StorageError::sqlite)?;

    get_consent(conn, external_id)?.ok_or_else(|| StorageError::NotFound {
        entity: "consent",
        id: external_id.to_string(),
    })
}

/// Flag a consent as deleted. Returns whether a live row was flagged.
pub fn soft_delete_consent(conn: &Connection, external_id: &Uuid) -> Result<bool, StorageError> {
    let flagged = conn
        .execute(
            "UPDATE emr_consent SET deleted = 1, modified_date = ?1
             WHERE external_id = ?2 AND deleted = 0",
            params![to_db_time(&Utc::now()), uuid_param(external_id)],
        )
        .map_err(StorageError::sqlite)?;
    Ok(flagged > 0)
}

pub fn count_consents(conn: &Connection, include_deleted: bool) -> Result<i64, StorageError> {
    let sql = if include_deleted {
        "SELECT COUNT(*) FROM emr_consent"
    } else {
        "SELECT COUNT(*) FROM emr_consent WHERE deleted = 0"
    };
    conn.query_row(sql, [], |row| row.get(0))
        .map_err(StorageError::sqlite)
}
