// audit.rs - Audit subcommands: verify, tail.

use std::path::PathBuf;

use clap::Subcommand;

use aifs_audit::{AuditError, AuditLog, Outcome};

use super::Session;

#[derive(Subcommand)]
pub enum AuditCommands {
    /// Verify the hash chain of every day file.
    Verify {
        /// Audit directory (defaults to .aifs/audit).
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Show recent audit events.
    Tail {
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Number of events to show.
        #[arg(short, default_value = "10")]
        n: usize,
    },
}

pub fn execute(cmd: &AuditCommands, session: &Session) -> anyhow::Result<()> {
    match cmd {
        AuditCommands::Verify { dir } => {
            let dir = dir.clone().unwrap_or_else(|| session.layout.audit_dir.clone());
            let files = AuditLog::day_files(&dir)?;
            if files.is_empty() {
                println!("No audit log found in {}", dir.display());
                return Ok(());
            }

            match AuditLog::verify_all(&dir) {
                Ok(count) => {
                    println!(
                        "Audit log verified: {} event(s) in {} day file(s), hash chains intact.",
                        count,
                        files.len()
                    );
                }
                Err(AuditError::IntegrityViolation {
                    path,
                    line,
                    expected,
                    actual,
                }) => {
                    println!("INTEGRITY VIOLATION in {} at line {}:", path.display(), line);
                    println!("  Expected previous_hash: {}", expected);
                    println!("  Actual previous_hash:   {}", actual);
                    println!();
                    println!("The audit log may have been tampered with.");
                    anyhow::bail!("Audit log integrity check failed");
                }
                Err(e) => return Err(e.into()),
            }
        }

        AuditCommands::Tail { dir, n } => {
            let dir = dir.clone().unwrap_or_else(|| session.layout.audit_dir.clone());
            let events = AuditLog::read_all(&dir)?;
            let start = events.len().saturating_sub(*n);
            let recent = &events[start..];

            if recent.is_empty() {
                println!("No audit events.");
                return Ok(());
            }

            println!(
                "{:<20} {:<12} {:<10} {:<8} TARGET",
                "TIMESTAMP", "ACTOR", "KIND", "OUTCOME"
            );
            println!("{}", "-".repeat(80));

            for event in recent {
                let record = &event.record;
                let outcome = match &record.outcome {
                    Outcome::Success => "ok",
                    Outcome::Failure { .. } => "FAILED",
                };
                println!(
                    "{:<20} {:<12} {:<10} {:<8} {}",
                    record.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    record.actor,
                    record.kind.as_str(),
                    outcome,
                    record.targets.join(" -> "),
                );
            }
        }
    }

    Ok(())
}
