//! Tests for the care configuration system.

use std::sync::Mutex;

use care_core::config::{CareConfig, CliOverrides};
use care_core::errors::ConfigError;

/// Serializes tests that touch environment variables.
static ENV_MUTEX: Mutex<()> = Mutex::new(());

fn tempdir() -> tempfile::TempDir {
    tempfile::TempDir::new().unwrap()
}

fn clear_care_env_vars() {
    for key in [
        "CARE_DATABASE_PATH",
        "CARE_DATABASE_BUSY_TIMEOUT_MS",
        "CARE_AUTH_USER_MODEL",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn layered_resolution_cli_over_env_over_project() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_care_env_vars();

    let dir = tempdir();
    std::fs::write(
        dir.path().join("care.toml"),
        r#"
[database]
path = "project.db"
busy_timeout_ms = 2500

[migrations]
auth_user_model = "accounts.Member"
"#,
    )
    .unwrap();

    std::env::set_var("CARE_DATABASE_PATH", "env.db");
    let cli = CliOverrides {
        auth_user_model: Some("users.User".to_string()),
        ..Default::default()
    };

    let config = CareConfig::load(dir.path(), Some(&cli)).unwrap();
    assert_eq!(config.database.effective_path(), "env.db");
    assert_eq!(config.database.effective_busy_timeout_ms(), 2500);
    assert_eq!(config.migrations.effective_auth_user_model(), "users.User");

    clear_care_env_vars();
}

#[test]
fn missing_project_file_falls_back_to_defaults() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_care_env_vars();

    let dir = tempdir();
    let config = CareConfig::load(dir.path(), None).unwrap();
    assert_eq!(config.database.effective_path(), "care.db");
    assert_eq!(config.database.effective_busy_timeout_ms(), 5000);
    assert_eq!(config.migrations.effective_auth_user_model(), "auth.User");
}

#[test]
fn invalid_toml_is_a_parse_error() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_care_env_vars();

    let dir = tempdir();
    std::fs::write(dir.path().join("care.toml"), "[database\npath = ").unwrap();
    let err = CareConfig::load(dir.path(), None).unwrap_err();
    assert!(matches!(err, ConfigError::ParseError { .. }));
}

#[test]
fn malformed_user_model_fails_validation() {
    let config = CareConfig::from_toml("[migrations]\nauth_user_model = \"User\"\n").unwrap();
    let err = CareConfig::validate(&config).unwrap_err();
    match err {
        ConfigError::ValidationFailed { field, .. } => {
            assert_eq!(field, "migrations.auth_user_model")
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn zero_busy_timeout_fails_validation() {
    let config = CareConfig::from_toml("[database]\nbusy_timeout_ms = 0\n").unwrap();
    assert!(CareConfig::validate(&config).is_err());
}

#[test]
fn explicit_config_file_must_exist() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_care_env_vars();

    let dir = tempdir();
    let err = CareConfig::load_file(&dir.path().join("nope.toml"), None).unwrap_err();
    assert!(matches!(err, ConfigError::FileNotFound { .. }));
}

#[test]
fn unknown_keys_are_ignored() {
    let config = CareConfig::from_toml(
        "[database]\npath = \"x.db\"\nfuture_option = true\n[telemetry]\nenabled = false\n",
    )
    .unwrap();
    assert_eq!(config.database.effective_path(), "x.db");
}
