//! In-memory state of one model.

use care_core::errors::MigrationError;

use super::field::{Field, ModelRef};

/// The fields of one model as of some point in the migration history.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelState {
    pub app_label: String,
    pub name: String,
    pub fields: Vec<Field>,
}

impl ModelState {
    pub fn new(app_label: &str, name: &str, fields: Vec<Field>) -> Self {
        Self {
            app_label: app_label.to_string(),
            name: name.to_string(),
            fields,
        }
    }

    pub fn model_ref(&self) -> ModelRef {
        ModelRef::new(&self.app_label, &self.name)
    }

    /// Table name: `<app_label>_<lowercase model name>`.
    pub fn db_table(&self) -> String {
        self.model_ref().db_table()
    }

    /// Replace a field definition in place, keeping column order.
    pub fn replace_field(&mut self, name: &str, field: Field) -> Result<(), MigrationError> {
        let Some(index) = self.fields.iter().position(|f| f.name == name) else {
            return Err(MigrationError::FieldNotFound {
                model: self.model_ref().to_string(),
                field: name.to_string(),
            });
        };
        self.fields[index] = field;
        Ok(())
    }

    /// Column names in declaration order.
    pub fn columns(&self) -> Vec<String> {
        self.fields.iter().map(Field::column).collect()
    }
}
