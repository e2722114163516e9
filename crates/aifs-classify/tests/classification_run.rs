// classification_run.rs - Classification runs against real temp workspaces.
//
// Files are created through FsConnector, classified with the standard
// extractors, and the resulting tree, rule document and history checked.

use std::io::Cursor;
use std::sync::{Arc, Mutex};

use tempfile::{tempdir, TempDir};

use aifs_audit::{AuditLog, OperationKind};
use aifs_classify::{
    ClassificationEngine, ClassifyConfig, ExtractError, IndexBatch, IndexQueue, IndexSink,
    RuleBlock, RuleChange, RuleSet,
};
use aifs_connector_fs::{FsConfig, FsConnector};
use aifs_vcs::{Repository, VcsConfig};
use aifs_workspace::{WorkspaceLayout, WorkspaceRoot};

fn git_available() -> bool {
    which::which("git").is_ok()
}

fn workspace(versioned: bool) -> (TempDir, FsConnector, WorkspaceLayout) {
    let dir = tempdir().unwrap();
    let root = WorkspaceRoot::new(dir.path()).unwrap();
    let layout = WorkspaceLayout::for_root(&root);
    layout.ensure_dirs().unwrap();

    let vcs = if versioned {
        VcsConfig::default()
    } else {
        VcsConfig::disabled()
    };
    let repository = Repository::from_config(root.path(), &vcs);
    let connector = FsConnector::new(root, repository)
        .with_audit_log(AuditLog::open(&layout.audit_dir).unwrap())
        .with_actor("classifier");
    (dir, connector, layout)
}

fn png_bytes() -> Vec<u8> {
    let mut png = Vec::new();
    image::RgbImage::new(2, 2)
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .unwrap();
    png
}

#[test]
fn corrupted_document_is_routed_to_unclassified() {
    let (dir, conn, layout) = workspace(false);
    conn.write("invoice_march.txt", b"Invoice 1001 for March").unwrap();
    conn.write("invoice_april.txt", b"Invoice 1002 for April").unwrap();
    conn.write("notes.md", b"meeting notes").unwrap();
    conn.write("photo.png", &png_bytes()).unwrap();
    conn.write("broken.docx", b"this is not a zip archive").unwrap();

    let engine = ClassificationEngine::new(&conn, ClassifyConfig::default());
    let report = engine.run().unwrap();

    assert_eq!(report.plan.decisions.len(), 4);
    assert_eq!(report.plan.read_errors.len(), 1);
    let failure = &report.plan.read_errors[0];
    assert_eq!(failure.source, "broken.docx");
    assert_eq!(failure.destination, "unclassified/broken.docx");
    assert!(matches!(failure.error, ExtractError::Corrupt { format: "docx", .. }));

    assert!(report.plan.rules_created);
    assert_eq!(
        report.plan.rule_diff.added,
        vec![("invoice".to_string(), "invoice".to_string())]
    );
    let invoice: Vec<&str> = report
        .plan
        .decisions
        .iter()
        .filter(|d| d.block.as_deref() == Some("invoice"))
        .map(|d| d.destination.as_str())
        .collect();
    assert_eq!(invoice, vec!["invoice/invoice_april.txt", "invoice/invoice_march.txt"]);

    assert_eq!(report.moved.len(), 5);
    assert!(report.move_failures.is_empty());
    assert!(!report.indexed);

    let root = dir.path();
    assert!(root.join("unclassified/broken.docx").is_file());
    assert!(root.join("unclassified/notes.md").is_file());
    assert!(root.join("unclassified/photo.png").is_file());
    assert!(root.join("invoice/invoice_march.txt").is_file());
    assert!(!root.join("broken.docx").exists());

    let rules = RuleSet::load(&layout.rules_file).unwrap().unwrap();
    assert!(rules.block("invoice").is_some());
    assert_eq!(rules.catch_all_destination(), Some("unclassified"));

    let events = AuditLog::read_all(&layout.audit_dir).unwrap();
    let classify = events
        .iter()
        .rev()
        .find(|e| e.record.kind == OperationKind::Classify)
        .unwrap();
    assert_eq!(classify.record.count, Some(5));
    assert_eq!(AuditLog::verify_all(&layout.audit_dir).unwrap(), events.len());
}

#[test]
fn existing_blocks_survive_reconciliation() {
    let (dir, conn, layout) = workspace(false);
    let mut before = RuleSet::skeleton("unclassified");
    before.apply(&[
        RuleChange::AddBlock(RuleBlock::new("Reports", "docs/reports").with_tags(["report"])),
        RuleChange::AddBlock(RuleBlock::new("Images", "media").with_extensions(["png"])),
    ]);
    before.save(&layout.rules_file).unwrap();

    conn.write("q1.txt", b"quarterly report").unwrap();
    conn.write("receipt_a.txt", b"receipt for lunch").unwrap();
    conn.write("receipt_b.txt", b"receipt for taxi").unwrap();

    let report = ClassificationEngine::new(&conn, ClassifyConfig::default())
        .run()
        .unwrap();
    assert!(!report.plan.rules_created);

    let after = RuleSet::load(&layout.rules_file).unwrap().unwrap();
    after.ensure_covers(&before).unwrap();
    assert_eq!(after.block("Reports").unwrap().tags, vec!["report"]);
    assert_eq!(after.block("Images").unwrap().extensions, vec!["png"]);
    assert!(after.block("receipt").is_some());
    // Document order of the original blocks is unchanged.
    let names: Vec<&str> = after.blocks.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["Reports", "Images", "receipt", "Unclassified"]);

    assert!(dir.path().join("docs/reports/q1.txt").is_file());
    assert!(dir.path().join("receipt/receipt_a.txt").is_file());
    assert!(dir.path().join("receipt/receipt_b.txt").is_file());
}

#[test]
fn plan_leaves_everything_in_place() {
    let (dir, conn, layout) = workspace(false);
    conn.write("a.txt", b"alpha draft").unwrap();
    conn.write("b.txt", b"alpha review").unwrap();

    let plan = ClassificationEngine::new(&conn, ClassifyConfig::default())
        .plan()
        .unwrap();

    assert!(plan.rules_created);
    assert_eq!(plan.decisions.len(), 2);
    assert!(plan.decisions.iter().all(|d| d.block.as_deref() == Some("alpha")));
    assert!(!layout.rules_file.exists());
    assert!(dir.path().join("a.txt").is_file());
    assert!(dir.path().join("b.txt").is_file());
}

#[test]
fn classified_files_are_not_rediscovered() {
    let (_dir, conn, _layout) = workspace(false);
    conn.write("one.txt", b"first").unwrap();

    let engine = ClassificationEngine::new(&conn, ClassifyConfig::default());
    assert_eq!(engine.run().unwrap().moved.len(), 1);

    let second = engine.run().unwrap();
    assert!(second.plan.is_empty());
    assert!(second.moved.is_empty());
}

#[test]
fn name_collisions_get_numbered() {
    let (dir, conn, _layout) = workspace(false);
    conn.write("unclassified/notes.md", b"older notes").unwrap();
    conn.write("notes.md", b"newer notes").unwrap();

    let report = ClassificationEngine::new(&conn, ClassifyConfig::default())
        .run()
        .unwrap();

    assert_eq!(report.moved[0].destination, "unclassified/notes (1).md");
    let older = std::fs::read_to_string(dir.path().join("unclassified/notes.md")).unwrap();
    assert_eq!(older, "older notes");
}

#[test]
fn reserved_device_name_is_never_a_destination() {
    let (dir, conn, layout) = workspace(false);
    conn.write("receta.txt", b"con pollo con ajo").unwrap();
    conn.write("cena.txt", b"con queso con tomate").unwrap();

    let report = ClassificationEngine::new(&conn, ClassifyConfig::default())
        .run()
        .unwrap();

    assert!(report.move_failures.is_empty());
    assert_eq!(
        report.plan.rule_diff.added,
        vec![("txt files".to_string(), "by-type/txt".to_string())]
    );
    let rules = RuleSet::load(&layout.rules_file).unwrap().unwrap();
    assert!(rules.block("con").is_none());
    assert!(dir.path().join("by-type/txt/receta.txt").is_file());
    assert!(dir.path().join("by-type/txt/cena.txt").is_file());
}

#[test]
fn new_folder_avoids_an_existing_top_level_file() {
    let (dir, conn, _layout) = workspace(false);
    conn.write("invoice", b"scratch").unwrap();
    conn.write("invoice_a.txt", b"invoice acme").unwrap();
    conn.write("invoice_b.txt", b"invoice globex").unwrap();

    let report = ClassificationEngine::new(&conn, ClassifyConfig::default())
        .run()
        .unwrap();

    assert!(report.move_failures.is_empty());
    assert_eq!(
        report.plan.rule_diff.added,
        vec![("invoice".to_string(), "invoice (1)".to_string())]
    );
    assert!(dir.path().join("invoice (1)/invoice_a.txt").is_file());
    assert!(dir.path().join("invoice (1)/invoice_b.txt").is_file());
}

#[test]
fn oversized_structured_file_is_unreadable_but_text_is_sampled() {
    let (dir, conn, _layout) = workspace(false);
    let conn = conn.with_config(FsConfig {
        read_max_bytes: 16,
        ..FsConfig::default()
    });
    let png = png_bytes();
    assert!(png.len() > 16);
    conn.write("photo.png", &png).unwrap();
    conn.write("diary.txt", b"a long entry that runs well past the read limit").unwrap();

    let report = ClassificationEngine::new(&conn, ClassifyConfig::default())
        .run()
        .unwrap();

    assert_eq!(report.plan.read_errors.len(), 1);
    let failure = &report.plan.read_errors[0];
    assert_eq!(failure.source, "photo.png");
    assert_eq!(failure.destination, "unclassified/photo.png");
    assert!(matches!(failure.error, ExtractError::TooLarge { limit: 16, .. }));
    assert_eq!(report.plan.decisions.len(), 1);
    assert_eq!(report.plan.decisions[0].source, "diary.txt");
    assert!(report.move_failures.is_empty());
    assert!(dir.path().join("unclassified/photo.png").is_file());
}

#[test]
fn one_failed_move_does_not_stop_the_batch() {
    let (dir, conn, layout) = workspace(false);
    // A plain file where the rule expects a folder.
    conn.write(".blocker", b"in the way").unwrap();
    let mut rules = RuleSet::skeleton("unclassified");
    rules.apply(&[RuleChange::AddBlock(
        RuleBlock::new("Logs", ".blocker/logs").with_extensions(["log"]),
    )]);
    rules.save(&layout.rules_file).unwrap();

    conn.write("server.log", b"boot ok").unwrap();
    conn.write("todo.txt", b"water plants").unwrap();

    let report = ClassificationEngine::new(&conn, ClassifyConfig::default())
        .run()
        .unwrap();

    assert_eq!(report.move_failures.len(), 1);
    assert_eq!(report.move_failures[0].source, "server.log");
    assert_eq!(report.moved.len(), 1);
    assert_eq!(report.moved[0].destination, "unclassified/todo.txt");
    assert!(dir.path().join("server.log").is_file());
}

#[test]
fn each_move_is_committed_separately() {
    if !git_available() {
        return;
    }
    let (_dir, conn, _layout) = workspace(true);
    conn.write("a.txt", b"alpha").unwrap();
    conn.write("b.txt", b"beta").unwrap();

    let report = ClassificationEngine::new(&conn, ClassifyConfig::default())
        .run()
        .unwrap();
    assert_eq!(report.moved.len(), 2);
    assert!(report.moved.iter().all(|m| m.committed && m.commit.is_some()));

    let recent = conn.history(4).unwrap();
    assert_eq!(recent.len(), 4);
    assert!(recent[..2]
        .iter()
        .all(|c| c.subject.starts_with("[aifs] move ") && !c.changed.is_empty()));
}

struct Collect(Arc<Mutex<Vec<IndexBatch>>>);

impl IndexSink for Collect {
    fn deliver(&mut self, batch: &IndexBatch) -> std::io::Result<()> {
        self.0.lock().unwrap().push(batch.clone());
        Ok(())
    }
}

#[test]
fn moved_files_are_handed_to_the_indexer() {
    let (_dir, conn, _layout) = workspace(false);
    conn.write("a.txt", b"alpha").unwrap();
    conn.write("b.txt", b"beta").unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let engine = ClassificationEngine::new(&conn, ClassifyConfig::default())
        .with_index(IndexQueue::spawn("nomic-embed-text", Collect(seen.clone())));
    let report = engine.run().unwrap();
    assert!(report.indexed);
    drop(engine);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let mut paths: Vec<&str> = seen[0].files.iter().map(|f| f.path.as_str()).collect();
    paths.sort();
    assert_eq!(paths, vec!["unclassified/a.txt", "unclassified/b.txt"]);
}
