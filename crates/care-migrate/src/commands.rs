//! Command execution. Each command returns the lines to print, or the
//! operator-facing error string.

use std::path::Path;

use care_core::config::{CareConfig, CliOverrides};
use care_core::errors::{CareErrorCode, MigrationError};
use care_storage::migrations::{self, MigrationExecutor, MigrationKey, MigrationTarget};
use care_storage::DatabaseManager;

use crate::{Args, Command};

pub fn run(args: &Args) -> Result<Vec<String>, String> {
    let overrides = CliOverrides {
        database_path: args.database.clone(),
        auth_user_model: args.auth_user_model.clone(),
    };
    let config = match &args.config {
        Some(path) => CareConfig::load_file(path, Some(&overrides)),
        None => CareConfig::load(Path::new("."), Some(&overrides)),
    }
    .map_err(|e| e.operator_string())?;

    tracing::debug!(command = ?args.command, "running command");
    execute(&config, &args.command).map_err(|e| e.operator_string())
}

fn execute(config: &CareConfig, command: &Command) -> Result<Vec<String>, MigrationError> {
    let graph = migrations::registry(&config.migrations)?;
    let db = DatabaseManager::from_config(&config.database)?;

    db.with_writer(|conn| {
        let executor = MigrationExecutor::new(conn, &graph);
        match command {
            Command::Migrate { app, target, plan } => {
                let target = parse_target(app.as_deref(), target.as_deref());
                let steps = if *plan {
                    executor.plan(&target)?
                } else {
                    executor.migrate(&target)?
                };
                if steps.is_empty() {
                    return Ok(vec!["No migrations to apply.".to_string()]);
                }
                let prefix = if *plan { "Planned" } else { "Done" };
                Ok(steps
                    .iter()
                    .map(|step| format!("{prefix}: {step}"))
                    .collect())
            }
            Command::Showmigrations { app } => {
                let mut lines = Vec::new();
                let mut current_app = String::new();
                for (key, applied) in executor.show()? {
                    if app.as_deref().is_some_and(|a| a != key.app_label) {
                        continue;
                    }
                    if key.app_label != current_app {
                        current_app = key.app_label.clone();
                        lines.push(current_app.clone());
                    }
                    let mark = if applied { "X" } else { " " };
                    lines.push(format!(" [{mark}] {}", key.name));
                }
                Ok(lines)
            }
            Command::Sqlmigrate {
                app,
                name,
                backwards,
            } => executor
                .sql_for(&MigrationKey::new(app, name), *backwards)
                .map(|sql| sql.into_iter().map(|s| format!("{s};")).collect()),
        }
    })
}

fn parse_target(app: Option<&str>, target: Option<&str>) -> MigrationTarget {
    match (app, target) {
        (None, _) => MigrationTarget::All,
        (Some(app), None) => MigrationTarget::App(app.to_string()),
        (Some(app), Some("zero")) => MigrationTarget::Zero(app.to_string()),
        (Some(app), Some(name)) => MigrationTarget::To(MigrationKey::new(app, name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_parse_from_positional_args() {
        assert_eq!(parse_target(None, None), MigrationTarget::All);
        assert_eq!(
            parse_target(Some("emr"), None),
            MigrationTarget::App("emr".to_string())
        );
        assert_eq!(
            parse_target(Some("emr"), Some("zero")),
            MigrationTarget::Zero("emr".to_string())
        );
        assert_eq!(
            parse_target(Some("emr"), Some("0019_device_metadata")),
            MigrationTarget::To(MigrationKey::new("emr", "0019_device_metadata"))
        );
    }

    #[test]
    fn sqlmigrate_prints_statements_for_in_memory_db() {
        let mut config = CareConfig::default();
        config.database.path = Some(":memory:".to_string());
        let lines = execute(
            &config,
            &Command::Sqlmigrate {
                app: "emr".to_string(),
                name: "0020_alter_deviceservicehistory_serviced_on_consent".to_string(),
                backwards: false,
            },
        )
        .unwrap();
        assert!(lines.iter().any(|l| l.starts_with("CREATE TABLE \"emr_consent\"")));
        assert!(lines.iter().all(|l| l.ends_with(';')));
    }
}
