//! ProjectState: every model known at one point of the migration history.

use std::collections::BTreeMap;

use care_core::errors::MigrationError;

use super::field::ModelRef;
use super::model::ModelState;

/// Models keyed by `(app_label, lowercase model name)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectState {
    models: BTreeMap<(String, String), ModelState>,
}

impl ProjectState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_model(&mut self, model: ModelState) -> Result<(), MigrationError> {
        let key = model.model_ref().key();
        if self.models.contains_key(&key) {
            return Err(MigrationError::TableAlreadyExists {
                table: model.db_table(),
            });
        }
        self.models.insert(key, model);
        Ok(())
    }

    pub fn remove_model(&mut self, model: &ModelRef) -> Result<ModelState, MigrationError> {
        self.models
            .remove(&model.key())
            .ok_or_else(|| MigrationError::ModelNotFound {
                model: model.to_string(),
            })
    }

    pub fn model(&self, model: &ModelRef) -> Result<&ModelState, MigrationError> {
        self.models
            .get(&model.key())
            .ok_or_else(|| MigrationError::ModelNotFound {
                model: model.to_string(),
            })
    }

    pub fn model_mut(&mut self, model: &ModelRef) -> Result<&mut ModelState, MigrationError> {
        self.models
            .get_mut(&model.key())
            .ok_or_else(|| MigrationError::ModelNotFound {
                model: model.to_string(),
            })
    }

    pub fn contains(&self, model: &ModelRef) -> bool {
        self.models.contains_key(&model.key())
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
