//! Migration configuration.

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_AUTH_USER_MODEL;

/// Configuration for migration planning.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MigrationConfig {
    /// The swappable user model, as `app_label.ModelName`. Default: "auth.User".
    pub auth_user_model: Option<String>,
}

impl MigrationConfig {
    /// Returns the effective user model, defaulting to "auth.User".
    pub fn effective_auth_user_model(&self) -> &str {
        self.auth_user_model
            .as_deref()
            .unwrap_or(DEFAULT_AUTH_USER_MODEL)
    }
}
