//! MigrationExecutor: applies and reverts migrations as all-or-nothing units.
//!
//! Each migration runs inside one `BEGIN IMMEDIATE` transaction on the
//! writer connection with foreign-key enforcement suspended (SQLite table
//! rebuilds would otherwise cascade on `DROP TABLE`). Referential integrity
//! is re-checked with `PRAGMA foreign_key_check` before commit. Any failure
//! rolls the whole migration back.

use std::collections::BTreeSet;
use std::fmt;
use std::time::Instant;

use care_core::errors::MigrationError;
use care_core::traits::{Cancellable, CancellationToken};
use rusqlite::{Connection, Transaction, TransactionBehavior};

use super::graph::MigrationGraph;
use super::{recorder, MigrationKey};
use crate::connection::map_sqlite_error;
use crate::connection::pragmas::{foreign_keys_enabled, set_foreign_keys};
use crate::introspect;
use crate::schema::ProjectState;

/// What `migrate` should bring the database to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationTarget {
    /// Every known migration applied.
    All,
    /// Every migration of one app (and its dependencies) applied.
    App(String),
    /// Exactly up to this migration for its app: dependencies applied,
    /// later migrations of the same app reverted.
    To(MigrationKey),
    /// Every migration of one app reverted, along with its dependents.
    Zero(String),
}

/// One step of a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanStep {
    pub key: MigrationKey,
    pub backwards: bool,
}

impl fmt::Display for PlanStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = if self.backwards { "Unapply" } else { "Apply" };
        write!(f, "{verb} {}", self.key)
    }
}

/// Compiled SQL for one migration direction, grouped per operation.
struct CompiledMigration {
    steps: Vec<(String, Vec<String>)>,
}

/// Suspends foreign-key enforcement for its lifetime.
struct ForeignKeysSuspended<'c> {
    conn: &'c Connection,
    restore: bool,
}

impl<'c> ForeignKeysSuspended<'c> {
    fn new(conn: &'c Connection) -> Result<Self, MigrationError> {
        let restore = foreign_keys_enabled(conn)?;
        if restore {
            set_foreign_keys(conn, false)?;
        }
        Ok(Self { conn, restore })
    }
}

impl Drop for ForeignKeysSuspended<'_> {
    fn drop(&mut self) {
        if self.restore {
            if let Err(e) = set_foreign_keys(self.conn, true) {
                tracing::warn!(error = %e, "failed to re-enable foreign keys");
            }
        }
    }
}

/// Applies, reverts, and inspects migrations against one connection.
pub struct MigrationExecutor<'a> {
    conn: &'a Connection,
    graph: &'a MigrationGraph,
    cancel: CancellationToken,
}

impl<'a> MigrationExecutor<'a> {
    pub fn new(conn: &'a Connection, graph: &'a MigrationGraph) -> Self {
        Self {
            conn,
            graph,
            cancel: CancellationToken::new(),
        }
    }

    /// Use a caller-owned cancellation token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn applied(&self) -> Result<BTreeSet<MigrationKey>, MigrationError> {
        Ok(recorder::applied_keys(self.conn)?)
    }

    /// Every known migration in plan order with its applied flag.
    pub fn show(&self) -> Result<Vec<(MigrationKey, bool)>, MigrationError> {
        let applied = self.applied()?;
        Ok(self
            .graph
            .full_plan()
            .into_iter()
            .map(|key| {
                let is_applied = applied.contains(&key);
                (key, is_applied)
            })
            .collect())
    }

    /// Steps needed to reach `target`, without executing anything.
    pub fn plan(&self, target: &MigrationTarget) -> Result<Vec<PlanStep>, MigrationError> {
        let applied = self.applied()?;
        let forwards = |keys: Vec<MigrationKey>| -> Vec<PlanStep> {
            keys.into_iter()
                .filter(|k| !applied.contains(k))
                .map(|key| PlanStep {
                    key,
                    backwards: false,
                })
                .collect()
        };
        let backwards = |roots: Vec<MigrationKey>| -> Result<Vec<PlanStep>, MigrationError> {
            let mut seen = BTreeSet::new();
            let mut steps = Vec::new();
            for root in &roots {
                for key in self.graph.backwards_plan(root)? {
                    if applied.contains(&key) && seen.insert(key.clone()) {
                        steps.push(PlanStep {
                            key,
                            backwards: true,
                        });
                    }
                }
            }
            Ok(steps)
        };

        match target {
            MigrationTarget::All => Ok(forwards(self.graph.full_plan())),
            MigrationTarget::App(app) => Ok(forwards(self.graph.app_plan(app)?)),
            MigrationTarget::To(key) => {
                if applied.contains(key) {
                    let later: Vec<MigrationKey> = self
                        .graph
                        .children(key)
                        .filter(|c| c.app_label == key.app_label)
                        .cloned()
                        .collect();
                    backwards(later)
                } else {
                    Ok(forwards(self.graph.forwards_plan(key)?))
                }
            }
            MigrationTarget::Zero(app) => {
                let roots = self.graph.root_nodes(app);
                if roots.is_empty() {
                    return Err(MigrationError::UnknownMigration {
                        migration: format!("{app}.zero"),
                    });
                }
                backwards(roots)
            }
        }
    }

    /// Bring the database to `target`. Returns the executed steps.
    pub fn migrate(&self, target: &MigrationTarget) -> Result<Vec<PlanStep>, MigrationError> {
        let plan = self.plan(target)?;
        if plan.is_empty() {
            tracing::info!("no migrations to apply");
        }
        for step in &plan {
            if step.backwards {
                self.unapply(&step.key)?;
            } else {
                self.apply(&step.key)?;
            }
        }
        Ok(plan)
    }

    /// Apply one migration. Every dependency must already be applied.
    pub fn apply(&self, key: &MigrationKey) -> Result<(), MigrationError> {
        let migration = self.graph.get(key)?;
        let applied = self.applied()?;
        if let Some(missing) = self.graph.parents(key).find(|p| !applied.contains(*p)) {
            return Err(MigrationError::DependencyNotSatisfied {
                migration: key.to_string(),
                dependency: missing.to_string(),
            });
        }

        let compiled = self.compile(key, false)?;
        self.check_live_tables(key)?;

        let started = Instant::now();
        self.atomic(key, &compiled, |tx| {
            recorder::record_applied(tx, key)?;
            Ok(())
        })?;
        tracing::info!(
            app = %key.app_label,
            name = %key.name,
            operations = migration.operations.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "applied migration"
        );
        Ok(())
    }

    /// Compare the tables `key` creates and references with the live schema.
    /// The recorded state can drift from the database, and foreign keys are
    /// off while DDL runs, so a dangling `REFERENCES` would go unnoticed.
    fn check_live_tables(&self, key: &MigrationKey) -> Result<(), MigrationError> {
        let migration = self.graph.get(key)?;
        let app = migration.app_label();
        let mut created = BTreeSet::new();
        for op in &migration.operations {
            let creates = op.created_table(app);
            for table in op.referenced_tables() {
                let pending = created.contains(&table) || creates.as_ref() == Some(&table);
                if !pending && !introspect::table_exists(self.conn, &table)? {
                    return Err(MigrationError::DdlFailed {
                        migration: key.to_string(),
                        message: format!("referenced table {table} does not exist"),
                    });
                }
            }
            if let Some(table) = creates {
                if introspect::table_exists(self.conn, &table)? {
                    return Err(MigrationError::TableAlreadyExists { table });
                }
                created.insert(table);
            }
        }
        Ok(())
    }

    /// Revert one migration. Nothing applied may still depend on it.
    pub fn unapply(&self, key: &MigrationKey) -> Result<(), MigrationError> {
        let migration = self.graph.get(key)?;
        let applied = self.applied()?;
        if !applied.contains(key) {
            return Err(MigrationError::NotApplied {
                migration: key.to_string(),
            });
        }
        let dependents: Vec<String> = self
            .graph
            .children(key)
            .filter(|c| applied.contains(*c))
            .map(ToString::to_string)
            .collect();
        if !dependents.is_empty() {
            return Err(MigrationError::DependentsStillApplied {
                migration: key.to_string(),
                dependents: dependents.join(", "),
            });
        }

        let compiled = self.compile(key, true)?;
        let started = Instant::now();
        self.atomic(key, &compiled, |tx| {
            recorder::record_unapplied(tx, key)?;
            Ok(())
        })?;
        tracing::info!(
            app = %key.app_label,
            name = %key.name,
            operations = migration.operations.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "reverted migration"
        );
        Ok(())
    }

    /// SQL a migration would execute, in order, without touching the database.
    pub fn sql_for(&self, key: &MigrationKey, backwards: bool) -> Result<Vec<String>, MigrationError> {
        Ok(self
            .compile(key, backwards)?
            .steps
            .into_iter()
            .flat_map(|(_, sql)| sql)
            .collect())
    }

    /// Render every operation of `key` against the states around it.
    fn compile(&self, key: &MigrationKey, backwards: bool) -> Result<CompiledMigration, MigrationError> {
        let migration = self.graph.get(key)?;
        let app = migration.app_label();

        // states[i] is the state before operation i; states[n] is the final state.
        let mut states: Vec<ProjectState> = vec![self.graph.state_before(key)?];
        for op in &migration.operations {
            let mut next = states[states.len() - 1].clone();
            op.state_forwards(app, &mut next)?;
            states.push(next);
        }

        let mut steps = Vec::with_capacity(migration.operations.len());
        if backwards {
            for (i, op) in migration.operations.iter().enumerate().rev() {
                let sql = op.database_backwards(app, &states[i + 1], &states[i])?;
                steps.push((op.describe(), sql));
            }
        } else {
            for (i, op) in migration.operations.iter().enumerate() {
                let sql = op.database_forwards(app, &states[i], &states[i + 1])?;
                steps.push((op.describe(), sql));
            }
        }
        Ok(CompiledMigration { steps })
    }

    fn checkpoint(&self, key: &MigrationKey) -> Result<(), MigrationError> {
        self.cancel.check().inspect_err(|_| {
            tracing::warn!(migration = %key, "cancelled, rolling back");
        })
    }

    /// Run compiled SQL plus `record` in one transaction.
    fn atomic<F>(
        &self,
        key: &MigrationKey,
        compiled: &CompiledMigration,
        record: F,
    ) -> Result<(), MigrationError>
    where
        F: FnOnce(&Connection) -> Result<(), MigrationError>,
    {
        recorder::ensure_schema(self.conn)?;
        let _fk = ForeignKeysSuspended::new(self.conn)?;
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .map_err(map_sqlite_error)?;

        for (description, statements) in &compiled.steps {
            self.checkpoint(key)?;
            tracing::debug!(migration = %key, operation = %description, "running operation");
            for sql in statements {
                tx.execute_batch(sql).map_err(|e| {
                    tracing::error!(migration = %key, sql = %sql, error = %e, "DDL failed");
                    MigrationError::DdlFailed {
                        migration: key.to_string(),
                        message: e.to_string(),
                    }
                })?;
            }
        }

        let violations = introspect::foreign_key_violations(&tx)?;
        if !violations.is_empty() {
            return Err(MigrationError::DdlFailed {
                migration: key.to_string(),
                message: format!("foreign key check failed: {}", violations.join("; ")),
            });
        }

        self.checkpoint(key)?;
        record(&tx)?;
        tx.commit().map_err(|e| MigrationError::DdlFailed {
            migration: key.to_string(),
            message: e.to_string(),
        })
    }
}
