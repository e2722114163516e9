//! Version control configuration (`[vcs]` section of `config.toml`).

use serde::{Deserialize, Serialize};

/// Settings for the workspace repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VcsConfig {
    /// Auto-commit every mutating operation. When false the no-op adapter
    /// is used.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Local `user.name` set on the workspace repository.
    #[serde(default = "default_user_name")]
    pub user_name: String,

    /// Local `user.email` set on the workspace repository.
    #[serde(default = "default_user_email")]
    pub user_email: String,

    /// Branch created by `git init`.
    #[serde(default = "default_branch")]
    pub default_branch: String,

    /// Commit changes made outside aifs before each operation, so
    /// machine-authored commits only ever contain one operation.
    #[serde(default = "default_snapshot_manual_changes")]
    pub snapshot_manual_changes: bool,
}

impl Default for VcsConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            user_name: default_user_name(),
            user_email: default_user_email(),
            default_branch: default_branch(),
            snapshot_manual_changes: default_snapshot_manual_changes(),
        }
    }
}

impl VcsConfig {
    /// A configuration with versioning turned off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

// Serde default functions
fn default_enabled() -> bool {
    true
}

fn default_user_name() -> String {
    "aifs-agent".to_string()
}

fn default_user_email() -> String {
    "aifs-agent@local".to_string()
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_snapshot_manual_changes() -> bool {
    true
}
