//! Top-level care configuration with layered resolution.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{DatabaseConfig, MigrationConfig};
use crate::constants::PROJECT_CONFIG_FILE;
use crate::errors::ConfigError;

/// Top-level configuration aggregating all sub-configs.
///
/// Resolution order (highest priority first):
/// 1. CLI flags (applied via `apply_cli_overrides`)
/// 2. Environment variables (`CARE_*`)
/// 3. Project config (`care.toml` in project root)
/// 4. User config (`~/.care/config.toml`)
/// 5. Compiled defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CareConfig {
    pub database: DatabaseConfig,
    pub migrations: MigrationConfig,
}

/// CLI override arguments that can be applied to a config.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub database_path: Option<String>,
    pub auth_user_model: Option<String>,
}

impl CareConfig {
    /// Load configuration with layered resolution rooted at `root`.
    pub fn load(root: &Path, cli_overrides: Option<&CliOverrides>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Layer 4 (lowest priority): user config
        if let Some(user_config_path) = Self::user_config_path() {
            if user_config_path.exists() {
                Self::merge_toml_file(&mut config, &user_config_path)?;
            }
        }

        // Layer 3: project config
        let project_config_path = root.join(PROJECT_CONFIG_FILE);
        if project_config_path.exists() {
            Self::merge_toml_file(&mut config, &project_config_path)?;
        }

        // Layer 2: environment variables
        Self::apply_env_overrides(&mut config);

        // Layer 1 (highest priority): CLI flags
        if let Some(cli) = cli_overrides {
            Self::apply_cli_overrides(&mut config, cli);
        }

        Self::validate(&config)?;
        tracing::debug!(
            database = config.database.effective_path(),
            auth_user_model = config.migrations.effective_auth_user_model(),
            "configuration resolved"
        );
        Ok(config)
    }

    /// Load configuration from an explicit file, then apply env and CLI layers.
    pub fn load_file(path: &Path, cli_overrides: Option<&CliOverrides>) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let mut config = Self::default();
        Self::merge_toml_file(&mut config, path)?;
        Self::apply_env_overrides(&mut config);
        if let Some(cli) = cli_overrides {
            Self::apply_cli_overrides(&mut config, cli);
        }
        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML string (for testing).
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
            path: "<string>".to_string(),
            message: e.to_string(),
        })
    }

    /// Validate the configuration values.
    pub fn validate(config: &CareConfig) -> Result<(), ConfigError> {
        if let Some(ref model) = config.migrations.auth_user_model {
            let valid = match model.split_once('.') {
                Some((app, name)) => !app.is_empty() && !name.is_empty() && !name.contains('.'),
                None => false,
            };
            if !valid {
                return Err(ConfigError::ValidationFailed {
                    field: "migrations.auth_user_model".to_string(),
                    message: format!("expected 'app_label.ModelName', got '{model}'"),
                });
            }
        }
        if config.database.busy_timeout_ms == Some(0) {
            return Err(ConfigError::ValidationFailed {
                field: "database.busy_timeout_ms".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if let Some(ref path) = config.database.path {
            if path.trim().is_empty() {
                return Err(ConfigError::ValidationFailed {
                    field: "database.path".to_string(),
                    message: "must not be empty".to_string(),
                });
            }
        }
        Ok(())
    }

    fn user_config_path() -> Option<PathBuf> {
        dirs_path().map(|d| d.join("config.toml"))
    }

    /// Merge a TOML file into the existing config.
    /// Unknown keys are silently ignored (forward-compatible).
    fn merge_toml_file(config: &mut CareConfig, path: &Path) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;

        let file_config: CareConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        Self::merge(config, &file_config);
        Ok(())
    }

    /// Merge `other` into `base`, where `other` values override `base` values
    /// only when `other` has a `Some` value.
    fn merge(base: &mut CareConfig, other: &CareConfig) {
        if other.database.path.is_some() {
            base.database.path = other.database.path.clone();
        }
        if other.database.busy_timeout_ms.is_some() {
            base.database.busy_timeout_ms = other.database.busy_timeout_ms;
        }
        if other.migrations.auth_user_model.is_some() {
            base.migrations.auth_user_model = other.migrations.auth_user_model.clone();
        }
    }

    fn apply_env_overrides(config: &mut CareConfig) {
        if let Ok(val) = std::env::var("CARE_DATABASE_PATH") {
            config.database.path = Some(val);
        }
        if let Ok(val) = std::env::var("CARE_DATABASE_BUSY_TIMEOUT_MS") {
            if let Ok(v) = val.parse::<u64>() {
                config.database.busy_timeout_ms = Some(v);
            }
        }
        if let Ok(val) = std::env::var("CARE_AUTH_USER_MODEL") {
            config.migrations.auth_user_model = Some(val);
        }
    }

    /// Apply CLI overrides (highest priority).
    pub fn apply_cli_overrides(config: &mut CareConfig, cli: &CliOverrides) {
        if let Some(ref path) = cli.database_path {
            config.database.path = Some(path.clone());
        }
        if let Some(ref model) = cli.auth_user_model {
            config.migrations.auth_user_model = Some(model.clone());
        }
    }
}

/// Returns the user config directory: `~/.care`.
fn dirs_path() -> Option<PathBuf> {
    home_dir().map(|h| h.join(".care"))
}

/// Cross-platform home directory resolution.
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}
