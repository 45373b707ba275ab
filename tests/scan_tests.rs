//! End-to-end scan tests against a scripted backend process.
//!
//! The backend is a `/bin/sh` script receiving `<directory> --similar`, so
//! these tests only run on Unix.

#![cfg(unix)]

mod common;

use std::fs;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dupewise::actions::DeletionPlanner;
use dupewise::duplicates::GroupKind;
use dupewise::scan::{
    OutcomeKind, ProcessBackend, ScanError, ScanObserver, ScanOrchestrator, ScanOutcome,
    ScanState, SessionHandle,
};
use tempfile::TempDir;

#[derive(Default)]
struct Collector {
    statuses: Mutex<Vec<String>>,
    finished: Mutex<Vec<OutcomeKind>>,
}

impl ScanObserver for Collector {
    fn on_status(&self, line: &str) {
        self.statuses.lock().unwrap().push(line.to_string());
    }

    fn on_finished(&self, outcome: &ScanOutcome) {
        self.finished.lock().unwrap().push(outcome.kind());
    }
}

fn orchestrator(dir: &TempDir, script_body: &str, session: SessionHandle) -> ScanOrchestrator {
    let script = common::write_backend_script(dir.path(), script_body);
    let backend = ProcessBackend::new("/bin/sh").with_leading_args([script]);
    ScanOrchestrator::new(Arc::new(backend), session)
}

#[test]
fn test_scan_parses_backend_output() {
    let workspace = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();
    let orch = orchestrator(
        &workspace,
        r#"echo "Processed 4 files" >&2
echo "unrelated chatter" >&2
cat <<'EOF'
EXACT|1.0
/a
/b
---GROUP---
SIMILAR|0.8
/c|0.9
/d|0.7
---GROUP---
EOF
echo "Done" >&2
"#,
        SessionHandle::new(),
    );
    let collector = Arc::new(Collector::default());

    let outcome = orch.run_scan(Some(target.path()), collector.clone()).unwrap();

    let ScanOutcome::Completed(done) = outcome else {
        panic!("expected completed scan");
    };
    assert_eq!(done.groups.raw_groups().len(), 2);
    assert_eq!(done.groups.raw_groups()[0].kind, GroupKind::Exact);
    assert_eq!(done.groups.raw_groups()[1].kind, GroupKind::Similar);
    assert!(done.anomalies.is_empty());
    assert_eq!(done.status_lines, vec!["Processed 4 files", "Done"]);
    assert_eq!(*collector.statuses.lock().unwrap(), done.status_lines);
    assert_eq!(*collector.finished.lock().unwrap(), vec![OutcomeKind::Completed]);

    let plan = DeletionPlanner::plan(&done.groups);
    assert_eq!(plan.candidates(), vec![std::path::PathBuf::from("/b")]);
}

#[test]
fn test_empty_output_means_no_duplicates() {
    let workspace = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();
    let orch = orchestrator(&workspace, "exit 0\n", SessionHandle::new());

    let outcome = orch
        .run_scan(Some(target.path()), Arc::new(Collector::default()))
        .unwrap();

    assert!(outcome.is_completed());
    assert!(orch.session().groups().no_duplicates_found());
    assert!(orch.session().groups().raw_groups().is_empty());
}

#[test]
fn test_failed_scan_keeps_previous_results() {
    let workspace = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();
    let session = SessionHandle::new();

    let good = orchestrator(
        &workspace,
        "printf 'EXACT|1.0\\n/a\\n/b\\n---GROUP---\\n'\n",
        session.clone(),
    );
    good.run_scan(Some(target.path()), Arc::new(Collector::default()))
        .unwrap();
    assert_eq!(session.groups().exact_group_count(), 1);

    let failing_dir = TempDir::new().unwrap();
    let bad = orchestrator(
        &failing_dir,
        "echo 'permission denied reading /secret' >&2\nexit 2\n",
        session.clone(),
    );
    let outcome = bad
        .run_scan(Some(target.path()), Arc::new(Collector::default()))
        .unwrap();

    let ScanOutcome::Failed(failed) = &outcome else {
        panic!("expected failed scan");
    };
    assert_eq!(failed.exit_code, Some(2));
    assert!(failed.reason.contains("permission denied"));
    assert_eq!(session.groups().exact_group_count(), 1);
    assert_eq!(session.snapshot().last_backend_exit_code, Some(2));
    assert_eq!(session.state(), ScanState::Idle);
}

#[test]
fn test_timeout_kills_backend_and_keeps_model() {
    let workspace = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();
    let orch = orchestrator(&workspace, "sleep 5\necho 'EXACT|1.0'\n", SessionHandle::new())
        .with_timeout(Duration::from_millis(400));

    let outcome = orch
        .run_scan(Some(target.path()), Arc::new(Collector::default()))
        .unwrap();

    assert!(matches!(outcome, ScanOutcome::TimedOut { .. }));
    assert!(outcome.failure_message().unwrap().starts_with("Scanning timed out"));
    assert_eq!(orch.session().state(), ScanState::Idle);
    assert!(orch.session().groups().raw_groups().is_empty());
}

#[test]
fn test_missing_backend_is_rejected_before_running() {
    let target = TempDir::new().unwrap();
    let orch = ScanOrchestrator::new(
        Arc::new(ProcessBackend::new("/nonexistent/duplicate_finder")),
        SessionHandle::new(),
    );

    let result = orch.run_scan(Some(target.path()), Arc::new(Collector::default()));

    assert!(matches!(result, Err(ScanError::BackendMissing(_))));
    assert_eq!(orch.session().state(), ScanState::Idle);
    assert!(orch.session().snapshot().last_outcome.is_none());
}

#[test]
fn test_missing_directory_is_rejected() {
    let workspace = TempDir::new().unwrap();
    let orch = orchestrator(&workspace, "exit 0\n", SessionHandle::new());

    let result = orch.run_scan(
        Some(&workspace.path().join("does-not-exist")),
        Arc::new(Collector::default()),
    );

    assert!(matches!(result, Err(ScanError::DirectoryNotFound(_))));
}

#[test]
fn test_overlapping_request_is_rejected() {
    let workspace = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();
    let orch = orchestrator(&workspace, "sleep 1\n", SessionHandle::new());

    let job = orch
        .request_scan(Some(target.path()), Arc::new(Collector::default()))
        .unwrap();
    let second = orch.request_scan(Some(target.path()), Arc::new(Collector::default()));

    assert!(matches!(second, Err(ScanError::AlreadyRunning)));
    assert!(job.wait().is_completed());
    assert_eq!(orch.session().state(), ScanState::Idle);
}

#[test]
fn test_scan_then_delete_exact_duplicates() {
    let workspace = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();
    let keep = target.path().join("keep.txt");
    let dup1 = target.path().join("dup1.txt");
    let dup2 = target.path().join("dup2.txt");
    let similar_a = target.path().join("notes_a.txt");
    let similar_b = target.path().join("notes_b.txt");
    for path in [&keep, &dup1, &dup2] {
        fs::write(path, b"same bytes").unwrap();
    }
    fs::write(&similar_a, b"draft one").unwrap();
    fs::write(&similar_b, b"draft two").unwrap();

    let script = format!(
        "printf '%s\\n' 'EXACT|1.0' '{}' '{}' '{}' '---GROUP---' 'SIMILAR|0.9' '{}|0.9' '{}|0.85' '---GROUP---'\n",
        keep.display(),
        dup1.display(),
        dup2.display(),
        similar_a.display(),
        similar_b.display()
    );
    let orch = orchestrator(&workspace, &script, SessionHandle::new());

    let outcome = orch
        .run_scan(Some(target.path()), Arc::new(Collector::default()))
        .unwrap();
    let ScanOutcome::Completed(done) = outcome else {
        panic!("expected completed scan");
    };

    let summary = done.groups.summary();
    assert_eq!(summary.exact_duplicate_files, 2);
    assert_eq!(summary.reclaimable_bytes, 20);

    let plan = DeletionPlanner::plan(&done.groups);
    let report = DeletionPlanner::execute(&plan);

    assert_eq!(report.deleted_count(), 2);
    assert!(report.all_succeeded());
    assert_eq!(report.bytes_freed, 20);
    assert!(keep.exists());
    assert!(!dup1.exists());
    assert!(!dup2.exists());
    assert!(similar_a.exists());
    assert!(similar_b.exists());
}
