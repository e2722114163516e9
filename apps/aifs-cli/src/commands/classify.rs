// classify.rs - Sort loose files at the workspace root by rule.

use aifs_classify::{ClassificationEngine, ClassificationPlan, IndexQueue};

use super::Session;

pub fn execute(session: &Session, plan_only: bool) -> anyhow::Result<()> {
    let engine = ClassificationEngine::new(&session.fs, session.classify.clone());
    if plan_only {
        let plan = engine.plan()?;
        print_plan(&plan, &engine.rules_path().display().to_string());
        return Ok(());
    }

    let engine = engine.with_index(IndexQueue::from_config(&session.index, &session.layout));
    let report = engine.run()?;
    print_plan(&report.plan, &engine.rules_path().display().to_string());
    for moved in &report.moved {
        let note = match (&moved.commit, moved.committed) {
            (Some(id), _) => format!(" ({})", id),
            (None, false) => " (not committed)".to_string(),
            (None, true) => String::new(),
        };
        println!("  moved {} -> {}{}", moved.source, moved.destination, note);
    }
    for failure in &report.move_failures {
        println!(
            "  FAILED {} -> {}: {}",
            failure.source, failure.destination, failure.error
        );
    }
    if report.indexed {
        println!("Queued {} file(s) for indexing.", report.moved.len());
    }
    println!("{}", report.summary());

    if !report.move_failures.is_empty() {
        anyhow::bail!("{} file(s) could not be moved", report.move_failures.len());
    }
    Ok(())
}

fn print_plan(plan: &ClassificationPlan, rules_path: &str) {
    if plan.rules_created {
        println!("Created rule document {}", rules_path);
    }
    if !plan.rule_diff.is_empty() {
        println!("Rules: {}", plan.rule_diff);
    }
    if plan.is_empty() {
        println!("Nothing to classify.");
        return;
    }

    println!("{:<36} {:<20} DESTINATION", "FILE", "BLOCK");
    println!("{}", "-".repeat(80));
    for decision in &plan.decisions {
        println!(
            "{:<36} {:<20} {}",
            decision.source,
            decision.block.as_deref().unwrap_or("-"),
            decision.destination,
        );
    }
    for failure in &plan.read_errors {
        println!(
            "{:<36} {:<20} {}  [{}]",
            failure.source, "(unreadable)", failure.destination, failure.error
        );
    }
}
