//! care-migrate: apply, revert, and inspect schema migrations.
//!
//! ## Usage
//!
//! ```bash
//! # Apply everything pending
//! care-migrate migrate
//!
//! # Bring one app to a specific migration (reverting later ones if applied)
//! care-migrate migrate emr 0019_device_metadata
//!
//! # Revert every migration of an app
//! care-migrate migrate emr zero
//!
//! # Show what would run without running it
//! care-migrate migrate --plan
//!
//! # List migrations and whether they are applied
//! care-migrate showmigrations
//!
//! # Print the SQL of one migration
//! care-migrate sqlmigrate emr 0020_alter_deviceservicehistory_serviced_on_consent
//! ```
//!
//! Failures are printed as `[ERROR_CODE] message` and exit with status 1.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "care-migrate", version = care_core::constants::VERSION)]
#[command(about = "Apply, revert, and inspect care schema migrations")]
pub struct Args {
    /// Path to a config file (default: care.toml in the current directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// SQLite database path
    #[arg(long, env = "CARE_DATABASE_PATH")]
    pub database: Option<String>,

    /// Swappable user model, as app_label.ModelName
    #[arg(long)]
    pub auth_user_model: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Apply or revert migrations to reach a target
    Migrate {
        /// App to migrate (default: all apps)
        app: Option<String>,
        /// Migration name within the app, or "zero" to revert the app
        target: Option<String>,
        /// Print the plan instead of executing it
        #[arg(long)]
        plan: bool,
    },
    /// List migrations and whether each is applied
    Showmigrations {
        /// Only show this app
        app: Option<String>,
    },
    /// Print the SQL for one migration
    Sqlmigrate {
        app: String,
        name: String,
        /// Print the SQL that reverts the migration
        #[arg(long)]
        backwards: bool,
    },
}

fn main() -> ExitCode {
    care_core::tracing::init_tracing();
    let args = Args::parse();

    match commands::run(&args) {
        Ok(lines) => {
            for line in lines {
                println!("{line}");
            }
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}
