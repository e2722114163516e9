//! # aifs-cli
//!
//! Command-line interface for the aifs workspace.
//!
//! Every command goes through the same sandboxed, versioned, audited
//! connector the agent uses:
//! - `aifs ls/find/cat/stat` - inspect the workspace
//! - `aifs write/cp/mv/rm/mkdir` - change it, one commit per operation
//! - `aifs holding list/restore` - recover deleted items
//! - `aifs log/rollback` - review and undo history
//! - `aifs classify` - sort loose files into folders by rule
//! - `aifs audit verify/tail` - inspect the daily audit trail

mod commands;
mod config;
mod logging;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::Session;
use crate::config::AgentConfig;

/// aifs - sandboxed, versioned file operations for agents.
#[derive(Parser)]
#[command(name = "aifs", version, about)]
struct Cli {
    /// Configuration file (defaults to the platform config dir).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Workspace root; overrides `workspace_dir` from the configuration.
    #[arg(long, short = 'w', global = true)]
    workspace: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List a directory.
    Ls {
        #[arg(default_value = ".")]
        path: String,
        /// Walk the whole subtree.
        #[arg(short, long)]
        recursive: bool,
    },
    /// Search for names matching a substring or glob.
    Find {
        pattern: String,
        /// Directory to search below.
        #[arg(long, default_value = ".")]
        base: String,
        /// Only look at immediate children of the base.
        #[arg(long)]
        shallow: bool,
    },
    /// Print a file, or a byte window of it.
    Cat {
        path: String,
        #[arg(long, default_value = "0")]
        offset: u64,
        #[arg(long)]
        length: Option<u64>,
    },
    /// Show metadata for a path.
    Stat { path: String },
    /// Write a file from an argument or stdin.
    Write {
        path: String,
        /// Content to write; read from stdin when omitted.
        content: Option<String>,
    },
    /// Copy a file or directory.
    Cp {
        src: String,
        dst: String,
        /// Fail instead of replacing an existing destination.
        #[arg(long)]
        no_overwrite: bool,
    },
    /// Move or rename a file or directory.
    Mv {
        src: String,
        dst: String,
        #[arg(long)]
        no_overwrite: bool,
    },
    /// Delete a path reversibly.
    Rm {
        path: String,
        /// Allow deleting non-empty directories.
        #[arg(short, long)]
        recursive: bool,
    },
    /// Create a directory and any missing parents.
    Mkdir { path: String },
    /// Recover items from the holding area.
    Holding {
        #[command(subcommand)]
        command: commands::holding::HoldingCommands,
    },
    /// Show recent commits.
    Log {
        #[arg(short, default_value = "10")]
        n: usize,
    },
    /// Reset the workspace to an earlier commit.
    Rollback {
        /// HEAD~N, ~N, or a commit hash.
        reference: String,
        /// Skip the interactive confirmation.
        #[arg(long)]
        yes: bool,
        /// Also remove files never committed.
        #[arg(long)]
        clean: bool,
    },
    /// Sort files at the workspace root into folders by rule.
    Classify {
        /// Show what would happen without moving anything or saving rules.
        #[arg(long)]
        plan: bool,
    },
    /// Inspect the audit trail.
    Audit {
        #[command(subcommand)]
        command: commands::audit::AuditCommands,
    },
    /// Show the effective configuration.
    Config,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone().or_else(config::default_path);
    let mut config = AgentConfig::load(config_path.as_deref())?;
    if let Some(workspace) = cli.workspace {
        config.workspace_dir = Some(workspace);
    }

    if let Commands::Config = cli.command {
        return commands::show_config(&config, config_path.as_deref());
    }

    let session = Session::open(&config)?;
    let _log_guard = logging::init(&session.layout.logs_dir);
    tracing::debug!(root = %session.fs.root().path().display(), "workspace opened");

    match &cli.command {
        Commands::Ls { path, recursive } => commands::files::list(&session, path, *recursive),
        Commands::Find {
            pattern,
            base,
            shallow,
        } => commands::files::find(&session, base, pattern, !*shallow),
        Commands::Cat {
            path,
            offset,
            length,
        } => commands::files::cat(&session, path, *offset, *length),
        Commands::Stat { path } => commands::files::stat(&session, path),
        Commands::Write { path, content } => {
            commands::files::write(&session, path, content.as_deref())
        }
        Commands::Cp {
            src,
            dst,
            no_overwrite,
        } => commands::files::copy(&session, src, dst, !*no_overwrite),
        Commands::Mv {
            src,
            dst,
            no_overwrite,
        } => commands::files::move_path(&session, src, dst, !*no_overwrite),
        Commands::Rm { path, recursive } => commands::files::delete(&session, path, *recursive),
        Commands::Mkdir { path } => commands::files::mkdir(&session, path),
        Commands::Holding { command } => commands::holding::execute(command, &session),
        Commands::Log { n } => commands::history::log(&session, *n),
        Commands::Rollback {
            reference,
            yes,
            clean,
        } => commands::history::rollback(&session, reference, *yes, *clean),
        Commands::Classify { plan } => commands::classify::execute(&session, *plan),
        Commands::Audit { command } => commands::audit::execute(command, &session),
        Commands::Config => Ok(()),
    }
}
