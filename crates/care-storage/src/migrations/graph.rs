//! MigrationGraph: dependency resolution and deterministic plans.

use std::collections::{BTreeMap, BTreeSet};

use care_core::errors::MigrationError;

use super::{Dependency, Migration, MigrationKey};
use crate::schema::ProjectState;

/// Directed acyclic graph of migrations, edges pointing from a migration to
/// its resolved dependencies. Iteration order is by key, so plans are stable.
#[derive(Debug)]
pub struct MigrationGraph {
    nodes: BTreeMap<MigrationKey, Migration>,
    parents: BTreeMap<MigrationKey, BTreeSet<MigrationKey>>,
    children: BTreeMap<MigrationKey, BTreeSet<MigrationKey>>,
}

impl MigrationGraph {
    /// Build and validate the graph. Every dependency must resolve to a
    /// registered migration and the graph must be acyclic.
    pub fn new(migrations: Vec<Migration>) -> Result<Self, MigrationError> {
        let nodes: BTreeMap<MigrationKey, Migration> = migrations
            .into_iter()
            .map(|m| (m.key.clone(), m))
            .collect();

        let mut parents: BTreeMap<MigrationKey, BTreeSet<MigrationKey>> = BTreeMap::new();
        let mut children: BTreeMap<MigrationKey, BTreeSet<MigrationKey>> = BTreeMap::new();
        for key in nodes.keys() {
            parents.entry(key.clone()).or_default();
            children.entry(key.clone()).or_default();
        }

        for (key, migration) in &nodes {
            for dep in &migration.dependencies {
                let parent = Self::resolve(&nodes, dep)?;
                parents.entry(key.clone()).or_default().insert(parent.clone());
                children.entry(parent).or_default().insert(key.clone());
            }
        }

        let graph = Self {
            nodes,
            parents,
            children,
        };
        graph.ensure_acyclic()?;
        Ok(graph)
    }

    fn resolve(
        nodes: &BTreeMap<MigrationKey, Migration>,
        dep: &Dependency,
    ) -> Result<MigrationKey, MigrationError> {
        let unknown = || MigrationError::UnknownMigration {
            migration: dep.to_string(),
        };
        match dep {
            Dependency::Migration(key) => {
                if nodes.contains_key(key) {
                    Ok(key.clone())
                } else {
                    Err(unknown())
                }
            }
            Dependency::FirstOf { app_label } => nodes
                .values()
                .filter(|m| m.app_label() == app_label)
                .find(|m| {
                    !m.dependencies.iter().any(|d| {
                        matches!(d, Dependency::Migration(k) if &k.app_label == app_label)
                    })
                })
                .map(|m| m.key.clone())
                .ok_or_else(unknown),
        }
    }

    fn ensure_acyclic(&self) -> Result<(), MigrationError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }

        fn visit(
            graph: &MigrationGraph,
            key: &MigrationKey,
            marks: &mut BTreeMap<MigrationKey, Mark>,
        ) -> Result<(), MigrationError> {
            match marks.get(key) {
                Some(Mark::Done) => return Ok(()),
                Some(Mark::Visiting) => {
                    return Err(MigrationError::CircularDependency {
                        migration: key.to_string(),
                    })
                }
                None => {}
            }
            marks.insert(key.clone(), Mark::Visiting);
            for parent in graph.parents(key) {
                visit(graph, parent, marks)?;
            }
            marks.insert(key.clone(), Mark::Done);
            Ok(())
        }

        let mut marks = BTreeMap::new();
        for key in self.nodes.keys() {
            visit(self, key, &mut marks)?;
        }
        Ok(())
    }

    pub fn get(&self, key: &MigrationKey) -> Result<&Migration, MigrationError> {
        self.nodes
            .get(key)
            .ok_or_else(|| MigrationError::UnknownMigration {
                migration: key.to_string(),
            })
    }

    /// Resolved direct dependencies.
    pub fn parents(&self, key: &MigrationKey) -> impl Iterator<Item = &MigrationKey> {
        self.parents.get(key).into_iter().flatten()
    }

    /// Direct dependents.
    pub fn children(&self, key: &MigrationKey) -> impl Iterator<Item = &MigrationKey> {
        self.children.get(key).into_iter().flatten()
    }

    /// Migrations of `app` with no dependency inside the same app.
    pub fn root_nodes(&self, app_label: &str) -> Vec<MigrationKey> {
        self.nodes
            .keys()
            .filter(|k| k.app_label == app_label)
            .filter(|k| self.parents(k).all(|p| p.app_label != app_label))
            .cloned()
            .collect()
    }

    /// Migrations of `app` that nothing else in the same app depends on.
    pub fn leaf_nodes(&self, app_label: &str) -> Vec<MigrationKey> {
        self.nodes
            .keys()
            .filter(|k| k.app_label == app_label)
            .filter(|k| self.children(k).all(|c| c.app_label != app_label))
            .cloned()
            .collect()
    }

    /// All ancestors of `target` followed by `target`, dependencies first.
    pub fn forwards_plan(&self, target: &MigrationKey) -> Result<Vec<MigrationKey>, MigrationError> {
        self.get(target)?;
        let mut plan = Vec::new();
        let mut seen = BTreeSet::new();
        self.post_order(target, &mut seen, &mut plan, |g, k| g.parents(k).collect());
        Ok(plan)
    }

    /// All descendants of `target` followed by `target`, dependents first.
    pub fn backwards_plan(&self, target: &MigrationKey) -> Result<Vec<MigrationKey>, MigrationError> {
        self.get(target)?;
        let mut plan = Vec::new();
        let mut seen = BTreeSet::new();
        self.post_order(target, &mut seen, &mut plan, |g, k| g.children(k).collect());
        Ok(plan)
    }

    fn post_order<'a, F>(
        &'a self,
        key: &MigrationKey,
        seen: &mut BTreeSet<MigrationKey>,
        out: &mut Vec<MigrationKey>,
        next: F,
    ) where
        F: Fn(&'a Self, &MigrationKey) -> Vec<&'a MigrationKey> + Copy,
    {
        if !seen.insert(key.clone()) {
            return;
        }
        for neighbour in next(self, key) {
            self.post_order(neighbour, seen, out, next);
        }
        out.push(key.clone());
    }

    /// Every migration, dependencies before dependents.
    pub fn full_plan(&self) -> Vec<MigrationKey> {
        let mut plan = Vec::new();
        let mut seen = BTreeSet::new();
        for key in self.nodes.keys() {
            self.post_order(key, &mut seen, &mut plan, |g, k| g.parents(k).collect());
        }
        plan
    }

    /// Everything needed to bring `app` fully up to date.
    pub fn app_plan(&self, app_label: &str) -> Result<Vec<MigrationKey>, MigrationError> {
        let leaves = self.leaf_nodes(app_label);
        if leaves.is_empty() {
            return Err(MigrationError::UnknownMigration {
                migration: format!("{app_label}.__latest__"),
            });
        }
        let mut plan = Vec::new();
        let mut seen = BTreeSet::new();
        for leaf in &leaves {
            self.post_order(leaf, &mut seen, &mut plan, |g, k| g.parents(k).collect());
        }
        Ok(plan)
    }

    /// Schema state after applying every ancestor of `key`, excluding `key`.
    pub fn state_before(&self, key: &MigrationKey) -> Result<ProjectState, MigrationError> {
        let plan = self.forwards_plan(key)?;
        let mut state = ProjectState::new();
        for ancestor in plan.iter().filter(|k| *k != key) {
            let migration = self.get(ancestor)?;
            for op in &migration.operations {
                op.state_forwards(migration.app_label(), &mut state)?;
            }
        }
        Ok(state)
    }

    /// Schema state after applying `key` and everything it depends on.
    pub fn state_after(&self, key: &MigrationKey) -> Result<ProjectState, MigrationError> {
        let mut state = self.state_before(key)?;
        let migration = self.get(key)?;
        for op in &migration.operations {
            op.state_forwards(migration.app_label(), &mut state)?;
        }
        Ok(state)
    }
}
