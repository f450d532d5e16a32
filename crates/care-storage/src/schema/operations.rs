//! Schema operations: the tagged list a migration is made of.
//!
//! Each operation knows how to advance a `ProjectState` and how to render
//! the SQL that moves the database between two states.

use care_core::errors::MigrationError;

use super::ddl;
use super::field::{Field, FieldType, ModelRef};
use super::model::ModelState;
use super::state::ProjectState;

#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    CreateModel { name: String, fields: Vec<Field> },
    AlterField { model_name: String, name: String, field: Field },
    DeleteModel { name: String },
}

impl Operation {
    pub fn create_model(name: &str, fields: Vec<Field>) -> Self {
        Self::CreateModel {
            name: name.to_string(),
            fields,
        }
    }

    pub fn alter_field(model_name: &str, name: &str, field: Field) -> Self {
        Self::AlterField {
            model_name: model_name.to_string(),
            name: name.to_string(),
            field,
        }
    }

    pub fn delete_model(name: &str) -> Self {
        Self::DeleteModel {
            name: name.to_string(),
        }
    }

    /// Human-readable summary, as shown in plans.
    pub fn describe(&self) -> String {
        match self {
            Self::CreateModel { name, .. } => format!("Create model {name}"),
            Self::AlterField {
                model_name, name, ..
            } => format!("Alter field {name} on {model_name}"),
            Self::DeleteModel { name } => format!("Delete model {name}"),
        }
    }

    /// Table this operation creates when applied forwards.
    pub fn created_table(&self, app_label: &str) -> Option<String> {
        match self {
            Self::CreateModel { name, .. } => Some(ModelRef::new(app_label, name).db_table()),
            _ => None,
        }
    }

    /// Tables the created table points at through foreign keys.
    pub fn referenced_tables(&self) -> Vec<String> {
        match self {
            Self::CreateModel { fields, .. } => {
                let mut tables: Vec<String> = fields
                    .iter()
                    .filter_map(|f| match &f.field_type {
                        FieldType::ForeignKey { to, .. } => Some(to.db_table()),
                        _ => None,
                    })
                    .collect();
                tables.sort();
                tables.dedup();
                tables
            }
            _ => Vec::new(),
        }
    }

    /// Advance `state` past this operation.
    pub fn state_forwards(
        &self,
        app_label: &str,
        state: &mut ProjectState,
    ) -> Result<(), MigrationError> {
        match self {
            Self::CreateModel { name, fields } => {
                for field in fields {
                    if let FieldType::ForeignKey { to, .. } = &field.field_type {
                        let self_reference = *to == ModelRef::new(app_label, name);
                        if !self_reference && !state.contains(to) {
                            return Err(MigrationError::ModelNotFound {
                                model: to.to_string(),
                            });
                        }
                    }
                }
                state.add_model(ModelState::new(app_label, name, fields.clone()))
            }
            Self::AlterField {
                model_name,
                name,
                field,
            } => {
                let model = state.model_mut(&ModelRef::new(app_label, model_name))?;
                let mut field = field.clone();
                field.name = name.clone();
                model.replace_field(name, field)
            }
            Self::DeleteModel { name } => state
                .remove_model(&ModelRef::new(app_label, name))
                .map(|_| ()),
        }
    }

    /// SQL moving the database from `from` (before) to `to` (after).
    pub fn database_forwards(
        &self,
        app_label: &str,
        from: &ProjectState,
        to: &ProjectState,
    ) -> Result<Vec<String>, MigrationError> {
        match self {
            Self::CreateModel { name, .. } => {
                let model = to.model(&ModelRef::new(app_label, name))?;
                ddl::create_table_sql(model, to)
            }
            Self::AlterField { model_name, .. } => {
                let model = ModelRef::new(app_label, model_name);
                ddl::rebuild_table_sql(from.model(&model)?, to.model(&model)?, to)
            }
            Self::DeleteModel { name } => {
                let model = from.model(&ModelRef::new(app_label, name))?;
                Ok(vec![ddl::drop_table_sql(model)])
            }
        }
    }

    /// SQL moving the database from `from` (after) back to `to` (before).
    pub fn database_backwards(
        &self,
        app_label: &str,
        from: &ProjectState,
        to: &ProjectState,
    ) -> Result<Vec<String>, MigrationError> {
        match self {
            Self::CreateModel { name, .. } => {
                let model = from.model(&ModelRef::new(app_label, name))?;
                Ok(vec![ddl::drop_table_sql(model)])
            }
            Self::AlterField { model_name, .. } => {
                let model = ModelRef::new(app_label, model_name);
                ddl::rebuild_table_sql(from.model(&model)?, to.model(&model)?, to)
            }
            Self::DeleteModel { name } => {
                let model = to.model(&ModelRef::new(app_label, name))?;
                ddl::create_table_sql(model, to)
            }
        }
    }
}
