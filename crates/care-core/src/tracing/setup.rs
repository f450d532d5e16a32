//! Tracing initialization and configuration.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::constants::LOG_ENV_VAR;

static INIT: Once = Once::new();

/// Initialize the care tracing/logging system.
///
/// Reads `CARE_LOG` for per-subsystem log levels, e.g.
/// `CARE_LOG=care_storage=debug,care_migrate=info`.
/// Falls back to `care=info` if unset or invalid.
///
/// Idempotent: later calls are no-ops.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
            .unwrap_or_else(|_| EnvFilter::new("care=info"));

        // try_init: a test harness may have installed a subscriber already.
        let _ = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .with(filter)
            .try_init();
    });
}
