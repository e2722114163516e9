// holding.rs - Holding area subcommands: list, restore.

use clap::Subcommand;

use aifs_connector_fs::human_size;

use super::files::print_report;
use super::Session;

#[derive(Subcommand)]
pub enum HoldingCommands {
    /// List held items.
    List,
    /// Put a held item back.
    Restore {
        /// Holding id shown by `list` or by `rm`.
        id: String,
        /// Restore somewhere other than the original path.
        #[arg(long)]
        to: Option<String>,
    },
}

pub fn execute(cmd: &HoldingCommands, session: &Session) -> anyhow::Result<()> {
    match cmd {
        HoldingCommands::List => {
            let held = session.fs.held()?;
            if held.is_empty() {
                println!("Holding area is empty.");
                return Ok(());
            }
            println!("{:<38} {:<20} {:>10} PATH", "ID", "DELETED", "SIZE");
            println!("{}", "-".repeat(80));
            for entry in &held {
                println!(
                    "{:<38} {:<20} {:>10} {}",
                    entry.id,
                    entry.deleted_at.format("%Y-%m-%d %H:%M:%S"),
                    human_size(entry.size),
                    entry.original_path,
                );
            }
        }

        HoldingCommands::Restore { id, to } => {
            let report = session.fs.restore(id, to.as_deref())?;
            print_report(&report);
        }
    }

    Ok(())
}
