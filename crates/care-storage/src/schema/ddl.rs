//! SQLite DDL rendering for model states.
//!
//! SQLite has no `ALTER COLUMN`, so field alterations rebuild the table:
//! create `new__<table>`, copy rows, drop the old table, rename, and
//! recreate the indexes. The executor runs these with foreign-key
//! enforcement suspended so the drop does not fire cascades.

use care_core::errors::MigrationError;

use super::field::{Field, FieldDefault, FieldType};
use super::model::ModelState;
use super::state::ProjectState;

const REBUILD_PREFIX: &str = "new__";

/// Double-quote an identifier.
pub fn quote(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Declared SQLite type of a field.
pub fn column_type(field: &Field) -> String {
    match &field.field_type {
        FieldType::BigAutoField => "integer".to_string(),
        FieldType::UuidField => "char(32)".to_string(),
        FieldType::DateTimeField => "datetime".to_string(),
        FieldType::BooleanField => "bool".to_string(),
        FieldType::JsonField | FieldType::TextField => "text".to_string(),
        FieldType::CharField { max_length } => format!("varchar({max_length})"),
        FieldType::ForeignKey { .. } => "bigint".to_string(),
    }
}

/// Full column definition, including constraints and the `REFERENCES` clause.
pub fn column_definition(field: &Field, state: &ProjectState) -> Result<String, MigrationError> {
    let column = field.column();
    let mut def = format!("{} {}", quote(&column), column_type(field));

    if field.primary_key {
        def.push_str(" NOT NULL PRIMARY KEY");
        if field.field_type == FieldType::BigAutoField {
            def.push_str(" AUTOINCREMENT");
        }
        return Ok(def);
    }

    def.push_str(if field.null { " NULL" } else { " NOT NULL" });
    if field.unique {
        def.push_str(" UNIQUE");
    }
    if field.field_type == FieldType::JsonField {
        let q = quote(&column);
        def.push_str(&format!(" CHECK ((JSON_VALID({q}) OR {q} IS NULL))"));
    }
    if let FieldType::ForeignKey { to, on_delete } = &field.field_type {
        let target = state.model(to)?;
        let pk = target
            .fields
            .iter()
            .find(|f| f.primary_key)
            .ok_or_else(|| MigrationError::FieldNotFound {
                model: to.to_string(),
                field: "<primary key>".to_string(),
            })?;
        def.push_str(&format!(
            " REFERENCES {} ({})",
            quote(&target.db_table()),
            quote(&pk.column())
        ));
        if let Some(action) = on_delete.sql() {
            def.push_str(" ON DELETE ");
            def.push_str(action);
        }
    }
    Ok(def)
}

fn create_table_named(
    table: &str,
    model: &ModelState,
    state: &ProjectState,
) -> Result<String, MigrationError> {
    let columns = model
        .fields
        .iter()
        .map(|f| column_definition(f, state))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(format!(
        "CREATE TABLE {} ({})",
        quote(table),
        columns.join(", ")
    ))
}

/// Name of the standalone index for one column.
pub fn index_name(table: &str, column: &str) -> String {
    format!("{table}_{column}_idx")
}

/// `CREATE INDEX` statements for every field that needs one.
pub fn index_sql(model: &ModelState) -> Vec<String> {
    let table = model.db_table();
    model
        .fields
        .iter()
        .filter(|f| f.needs_index())
        .map(|f| {
            let column = f.column();
            format!(
                "CREATE INDEX {} ON {} ({})",
                quote(&index_name(&table, &column)),
                quote(&table),
                quote(&column)
            )
        })
        .collect()
}

/// `CREATE TABLE` plus its indexes.
pub fn create_table_sql(
    model: &ModelState,
    state: &ProjectState,
) -> Result<Vec<String>, MigrationError> {
    let mut sql = vec![create_table_named(&model.db_table(), model, state)?];
    sql.extend(index_sql(model));
    Ok(sql)
}

pub fn drop_table_sql(model: &ModelState) -> String {
    format!("DROP TABLE {}", quote(&model.db_table()))
}

/// SQL literal used to backfill `NULL`s, if the default has one.
pub fn default_literal(default: &FieldDefault) -> Option<&'static str> {
    match default {
        FieldDefault::None | FieldDefault::Null => None,
        FieldDefault::Bool(true) => Some("1"),
        FieldDefault::Bool(false) => Some("0"),
        FieldDefault::EmptyObject => Some("'{}'"),
        FieldDefault::EmptyArray => Some("'[]'"),
        FieldDefault::Uuid4 => Some("lower(hex(randomblob(16)))"),
        FieldDefault::Now => Some("strftime('%Y-%m-%dT%H:%M:%fZ', 'now')"),
    }
}

/// Rebuild `from`'s table so it matches `to`. Both must describe the same
/// table; columns present in both are copied.
pub fn rebuild_table_sql(
    from: &ModelState,
    to: &ModelState,
    state: &ProjectState,
) -> Result<Vec<String>, MigrationError> {
    let table = to.db_table();
    let temp = format!("{REBUILD_PREFIX}{table}");

    let mut targets = Vec::new();
    let mut sources = Vec::new();
    for field in &to.fields {
        let column = field.column();
        let Some(old) = from.fields.iter().find(|f| f.column() == column) else {
            continue;
        };
        let quoted = quote(&column);
        let source = match default_literal(&field.effective_default()) {
            Some(literal) if old.null && !field.null => format!("coalesce({quoted}, {literal})"),
            _ => quoted.clone(),
        };
        targets.push(quoted);
        sources.push(source);
    }

    let mut sql = vec![
        create_table_named(&temp, to, state)?,
        format!(
            "INSERT INTO {} ({}) SELECT {} FROM {}",
            quote(&temp),
            targets.join(", "),
            sources.join(", "),
            quote(&table)
        ),
        format!("DROP TABLE {}", quote(&table)),
        format!("ALTER TABLE {} RENAME TO {}", quote(&temp), quote(&table)),
    ];
    sql.extend(index_sql(to));
    Ok(sql)
}
