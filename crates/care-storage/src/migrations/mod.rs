//! Schema migrations: declared schema deltas and the engine that applies them.
//!
//! A migration is a named, versioned record holding a tagged list of
//! `Operation`s plus its dependencies. The `MigrationGraph` orders them,
//! the recorder persists which ones are applied, and the
//! `MigrationExecutor` applies or reverts each one as a single transaction.

pub mod auth_0001_initial;
pub mod emr_0019_device_metadata;
pub mod emr_0020_alter_deviceservicehistory_serviced_on_consent;
pub mod executor;
pub mod graph;
pub mod recorder;

use std::fmt;

use care_core::config::MigrationConfig;
use care_core::errors::MigrationError;

use crate::schema::{ModelRef, Operation};

pub use executor::{MigrationExecutor, MigrationTarget, PlanStep};
pub use graph::MigrationGraph;

/// Identity of a migration: `(app_label, name)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MigrationKey {
    pub app_label: String,
    pub name: String,
}

impl MigrationKey {
    pub fn new(app_label: &str, name: &str) -> Self {
        Self {
            app_label: app_label.to_string(),
            name: name.to_string(),
        }
    }
}

impl fmt::Display for MigrationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.app_label, self.name)
    }
}

/// A prerequisite that must be applied before a migration may run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dependency {
    /// A specific migration.
    Migration(MigrationKey),
    /// The first migration of an app. Used for the swappable user model,
    /// whose owning app is only known from configuration.
    FirstOf { app_label: String },
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Migration(key) => key.fmt(f),
            Self::FirstOf { app_label } => write!(f, "{app_label}.__first__"),
        }
    }
}

/// A versioned schema delta.
#[derive(Debug, Clone, PartialEq)]
pub struct Migration {
    pub key: MigrationKey,
    pub dependencies: Vec<Dependency>,
    pub operations: Vec<Operation>,
}

impl Migration {
    pub fn new(app_label: &str, name: &str) -> Self {
        Self {
            key: MigrationKey::new(app_label, name),
            dependencies: Vec::new(),
            operations: Vec::new(),
        }
    }

    pub fn depends_on(mut self, app_label: &str, name: &str) -> Self {
        self.dependencies
            .push(Dependency::Migration(MigrationKey::new(app_label, name)));
        self
    }

    /// Depend on whichever app provides the configured user model.
    pub fn depends_on_swappable(mut self, user_model: &ModelRef) -> Self {
        self.dependencies.push(Dependency::FirstOf {
            app_label: user_model.app_label.clone(),
        });
        self
    }

    pub fn operation(mut self, operation: Operation) -> Self {
        self.operations.push(operation);
        self
    }

    pub fn app_label(&self) -> &str {
        &self.key.app_label
    }
}

/// The configured user model.
pub fn user_model(config: &MigrationConfig) -> Result<ModelRef, MigrationError> {
    let model = config.effective_auth_user_model();
    ModelRef::parse(model).ok_or_else(|| MigrationError::ModelNotFound {
        model: model.to_string(),
    })
}

/// Every declared migration, resolved against the configured user model.
pub fn all_migrations(config: &MigrationConfig) -> Result<Vec<Migration>, MigrationError> {
    let user = user_model(config)?;
    Ok(vec![
        auth_0001_initial::migration(),
        emr_0019_device_metadata::migration(&user),
        emr_0020_alter_deviceservicehistory_serviced_on_consent::migration(&user),
    ])
}

/// Build the migration graph for the configured project.
pub fn registry(config: &MigrationConfig) -> Result<MigrationGraph, MigrationError> {
    MigrationGraph::new(all_migrations(config)?)
}
