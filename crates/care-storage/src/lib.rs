//! care-storage: SQLite connection management, the schema-state model, the
//! migration engine with its declared migrations, and row-level queries.

pub mod connection;
pub mod introspect;
pub mod migrations;
pub mod queries;
pub mod schema;

pub use connection::DatabaseManager;
pub use migrations::{
    Dependency, Migration, MigrationExecutor, MigrationGraph, MigrationKey, MigrationTarget,
    PlanStep,
};
