//! Declarative schema model: fields, model states, the project state built by
//! replaying migrations, schema operations, and their SQLite DDL.

pub mod ddl;
pub mod field;
pub mod model;
pub mod operations;
pub mod state;

pub use field::{Field, FieldDefault, FieldType, ModelRef, OnDelete};
pub use model::ModelState;
pub use operations::Operation;
pub use state::ProjectState;
