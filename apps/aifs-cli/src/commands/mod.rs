pub mod audit;
pub mod classify;
pub mod files;
pub mod history;
pub mod holding;

use std::path::Path;

use anyhow::Context;

use aifs_audit::AuditLog;
use aifs_classify::{ClassifyConfig, IndexConfig};
use aifs_connector_fs::FsConnector;
use aifs_vcs::Repository;
use aifs_workspace::{WorkspaceLayout, WorkspaceRoot};

use crate::config::AgentConfig;

const ACTOR: &str = "aifs-cli";

/// An opened workspace: the connector every command goes through, plus the
/// settings commands need beyond it.
pub struct Session {
    pub fs: FsConnector,
    pub layout: WorkspaceLayout,
    pub classify: ClassifyConfig,
    pub index: IndexConfig,
}

impl Session {
    pub fn open(config: &AgentConfig) -> anyhow::Result<Self> {
        let dir = config.workspace_dir()?;
        let root = WorkspaceRoot::new(&dir)
            .with_context(|| format!("cannot open workspace {}", dir.display()))?;
        let layout = WorkspaceLayout::for_root(&root);
        layout.ensure_dirs()?;

        let repository = Repository::from_config(root.path(), &config.vcs);
        let audit = AuditLog::open(&layout.audit_dir)?;
        let fs = FsConnector::new(root, repository)
            .with_config(config.fs.clone())
            .with_audit_log(audit)
            .with_actor(ACTOR);

        Ok(Self {
            fs,
            layout,
            classify: config.classify.clone(),
            index: config.index.clone(),
        })
    }
}

/// Print the effective configuration as TOML.
pub fn show_config(config: &AgentConfig, path: Option<&Path>) -> anyhow::Result<()> {
    match path {
        Some(path) if path.exists() => println!("# loaded from {}", path.display()),
        Some(path) => println!("# {} not found; defaults shown", path.display()),
        None => println!("# no config directory; defaults shown"),
    }
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
