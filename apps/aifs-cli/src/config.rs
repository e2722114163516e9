// config.rs - Agent configuration file (`config.toml`).
//
// One TOML document with a section per component. Every field has a
// default, so a missing file or an empty section is a valid configuration.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use aifs_classify::{ClassifyConfig, IndexConfig};
use aifs_connector_fs::FsConfig;
use aifs_vcs::VcsConfig;

/// Settings for one agent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Workspace root. Defaults to the current directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_dir: Option<PathBuf>,

    #[serde(default)]
    pub vcs: VcsConfig,

    #[serde(default)]
    pub fs: FsConfig,

    #[serde(default)]
    pub classify: ClassifyConfig,

    #[serde(default)]
    pub index: IndexConfig,
}

impl AgentConfig {
    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file; using defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid config in {}", path.display()))
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Workspace root to open.
    pub fn workspace_dir(&self) -> anyhow::Result<PathBuf> {
        match &self.workspace_dir {
            Some(dir) => Ok(dir.clone()),
            None => std::env::current_dir().context("cannot determine current directory"),
        }
    }
}

/// `<config dir>/aifs/config.toml`, when the platform has a config dir.
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("aifs").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aifs_connector_fs::DeleteMode;
    use tempfile::tempdir;

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = AgentConfig::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert!(config.workspace_dir.is_none());
        assert!(config.vcs.enabled);
        assert!(!config.index.enabled);
    }

    #[test]
    fn sections_override_defaults() {
        let config = AgentConfig::parse(
            r#"
workspace_dir = "/srv/agent"

[vcs]
enabled = false

[fs]
delete_mode = "holding"

[classify]
min_support = 3

[index]
enabled = true
embedding_model = "nomic-embed-text"
"#,
        )
        .unwrap();
        assert_eq!(config.workspace_dir, Some(PathBuf::from("/srv/agent")));
        assert!(!config.vcs.enabled);
        assert_eq!(config.fs.delete_mode, DeleteMode::Holding);
        assert_eq!(config.classify.min_support, 3);
        assert_eq!(config.classify.max_signal_chars, 1500);
        assert!(config.index.is_active());
    }

    #[test]
    fn unknown_delete_mode_is_rejected() {
        assert!(AgentConfig::parse("[fs]\ndelete_mode = \"shred\"").is_err());
    }
}
