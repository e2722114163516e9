// history.rs - Version history: log and rollback.

use std::io::{self, BufRead, Write};

use aifs_vcs::RevisionRef;

use super::Session;

pub fn log(session: &Session, n: usize) -> anyhow::Result<()> {
    let commits = session.fs.history(n)?;
    if commits.is_empty() {
        println!("No history (version control disabled or nothing committed yet).");
        return Ok(());
    }
    for commit in &commits {
        println!("{}", commit);
        println!("    {}", commit.change_summary());
    }
    Ok(())
}

pub fn rollback(session: &Session, reference: &str, yes: bool, clean: bool) -> anyhow::Result<()> {
    let target: RevisionRef = reference.parse()?;
    let preview = session.fs.preview_rollback(&target)?;
    println!("{}", preview.describe());
    if preview.target.is_none() {
        return Ok(());
    }

    if !yes && !confirm("Proceed?")? {
        println!("Rollback cancelled.");
        return Ok(());
    }

    let token = preview.confirm();
    let outcome = session.fs.rollback(&target, Some(&token), clean)?;
    if let Some(checkpoint) = &outcome.checkpoint {
        println!("Checkpointed outside edits as {}", checkpoint);
    }
    match &outcome.head {
        Some(head) => println!("Workspace now at {}", head),
        None => println!("Rollback had no effect."),
    }
    Ok(())
}

fn confirm(question: &str) -> anyhow::Result<bool> {
    print!("{} [y/N] ", question);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes" | "YES"))
}
