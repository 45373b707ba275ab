//! Drives one scan from request to model update.
//!
//! ```text
//! Idle ──request──▶ Running ──exit 0──────▶ Completed ─┐
//!                      │ ────exit ≠ 0──────▶ Failed    ├─▶ Idle
//!                      └────ceiling hit────▶ TimedOut ─┘
//! ```
//!
//! A request is validated before anything starts: a directory must be given
//! and exist, the backend must be present and no other scan may be running.
//! The backend runs on a worker thread; the model is swapped into the
//! session only after its output has been parsed completely, and only on
//! success. Failures keep the last good results.
//!
//! The backend reports no completion percentage, so progress is the elapsed
//! wall-clock time (one notification per second) plus any diagnostic line
//! containing a progress keyword.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::config::Config;
use crate::duplicates::GroupModel;
use crate::protocol::{parse_bytes, ProtocolAnomaly};
use crate::scan::backend::{Backend, BackendError, BackendEvents, ProcessBackend};
use crate::scan::session::{OutcomeKind, SessionHandle};

/// Reasons a scan request is rejected before anything runs.
#[derive(Debug, Error)]
pub enum ScanError {
    /// No directory was given.
    #[error("no directory selected")]
    NoDirectory,

    /// The directory does not exist.
    #[error("directory does not exist: {0}")]
    DirectoryNotFound(PathBuf),

    /// The path exists but is not a directory.
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The backend executable is not present.
    #[error("scanner backend not found: {0}")]
    BackendMissing(String),

    /// Another scan holds the session.
    #[error("a scan is already in progress")]
    AlreadyRunning,

    /// The worker thread could not be started.
    #[error("failed to start scan worker: {0}")]
    Spawn(#[source] io::Error),
}

/// A scan whose backend exited 0 and whose output was parsed.
#[derive(Debug, Clone)]
pub struct CompletedScan {
    /// The new model, already installed in the session
    pub groups: Arc<GroupModel>,
    /// Protocol irregularities that were defaulted
    pub anomalies: Vec<ProtocolAnomaly>,
    /// Progress lines from the diagnostic stream, in order
    pub status_lines: Vec<String>,
    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

/// A scan that ran but produced no usable result.
#[derive(Debug, Clone)]
pub struct FailedScan {
    /// Backend exit code, if it exited normally
    pub exit_code: Option<i32>,
    /// Diagnostic text explaining the failure
    pub reason: String,
    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

/// How a scan ended.
#[derive(Debug, Clone)]
pub enum ScanOutcome {
    /// Results replaced the model
    Completed(CompletedScan),
    /// Launch failure, non-zero exit or undecodable output
    Failed(FailedScan),
    /// Ceiling reached; the backend was killed
    TimedOut {
        /// The ceiling that was hit
        timeout: Duration,
    },
}

impl ScanOutcome {
    /// Session-level classification.
    #[must_use]
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Completed(_) => OutcomeKind::Completed,
            Self::Failed(_) => OutcomeKind::Failed,
            Self::TimedOut { .. } => OutcomeKind::TimedOut,
        }
    }

    /// Check if the scan completed.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    /// User-facing failure text, `None` on success.
    #[must_use]
    pub fn failure_message(&self) -> Option<String> {
        match self {
            Self::Completed(_) => None,
            Self::Failed(failed) => Some(match failed.exit_code {
                Some(code) => format!("Scanner backend failed (exit {code}): {}", failed.reason),
                None => format!("Scanner backend failed: {}", failed.reason),
            }),
            Self::TimedOut { timeout } => Some(format!(
                "Scanning timed out after {}",
                format_elapsed(*timeout)
            )),
        }
    }
}

/// Observer of a running scan.
///
/// Callbacks run on the worker thread.
pub trait ScanObserver: Send + Sync {
    /// The backend is about to start.
    fn on_started(&self, _directory: &Path) {}

    /// Called once per second while running.
    fn on_elapsed(&self, _elapsed: Duration) {}

    /// A diagnostic line containing a progress keyword.
    fn on_status(&self, _line: &str) {}

    /// The scan ended; the session is already updated.
    fn on_finished(&self, _outcome: &ScanOutcome) {}
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ScanObserver for NoopObserver {}

/// Format a duration as `"<m>m <s>s"`.
#[must_use]
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}m {}s", secs / 60, secs % 60)
}

/// A scan running on its worker thread.
#[derive(Debug)]
pub struct ScanJob {
    handle: JoinHandle<ScanOutcome>,
}

impl ScanJob {
    /// Block until the scan ends.
    #[must_use]
    pub fn wait(self) -> ScanOutcome {
        self.handle.join().unwrap_or_else(|_| {
            ScanOutcome::Failed(FailedScan {
                exit_code: None,
                reason: "scan worker panicked".to_string(),
                elapsed: Duration::ZERO,
            })
        })
    }
}

/// Runs scans against a backend and keeps the session current.
pub struct ScanOrchestrator {
    backend: Arc<dyn Backend>,
    session: SessionHandle,
    timeout: Duration,
    progress_keywords: Arc<Vec<String>>,
}

impl ScanOrchestrator {
    /// Orchestrator with the default timeout and progress keywords.
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, session: SessionHandle) -> Self {
        let defaults = Config::default();
        Self {
            backend,
            session,
            timeout: defaults.timeout(),
            progress_keywords: Arc::new(defaults.progress_keywords),
        }
    }

    /// Orchestrator running the configured backend process.
    #[must_use]
    pub fn from_config(config: &Config, session: SessionHandle) -> Self {
        let backend = ProcessBackend::new(config.resolve_backend());
        Self::new(Arc::new(backend), session)
            .with_timeout(config.timeout())
            .with_progress_keywords(config.progress_keywords.clone())
    }

    /// Override the per-invocation ceiling.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the keywords that mark a diagnostic line as progress.
    #[must_use]
    pub fn with_progress_keywords(mut self, keywords: Vec<String>) -> Self {
        self.progress_keywords = Arc::new(keywords);
        self
    }

    /// The session this orchestrator updates.
    #[must_use]
    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    /// Per-invocation ceiling.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Check a request without starting anything.
    ///
    /// # Errors
    ///
    /// Returns the first failed check, in order: directory given, directory
    /// exists, backend present, no scan running.
    pub fn validate(&self, directory: Option<&Path>) -> Result<PathBuf, ScanError> {
        let directory = match directory {
            Some(d) if !d.as_os_str().is_empty() => d,
            _ => return Err(ScanError::NoDirectory),
        };
        if !directory.exists() {
            return Err(ScanError::DirectoryNotFound(directory.to_path_buf()));
        }
        if !directory.is_dir() {
            return Err(ScanError::NotADirectory(directory.to_path_buf()));
        }
        if !self.backend.is_available() {
            return Err(ScanError::BackendMissing(self.backend.describe()));
        }
        if self.session.snapshot().running {
            return Err(ScanError::AlreadyRunning);
        }
        Ok(directory.to_path_buf())
    }

    /// Validate the request and start the scan on a worker thread.
    ///
    /// # Errors
    ///
    /// Any [`ScanError`]; the session stays idle when one is returned.
    pub fn request_scan(
        &self,
        directory: Option<&Path>,
        observer: Arc<dyn ScanObserver>,
    ) -> Result<ScanJob, ScanError> {
        let directory = self.validate(directory)?;
        // The running check in `validate` is advisory; `begin` is the gate.
        self.session.begin(&directory)?;

        log::info!(
            "Scanning {} with {} (timeout {}s)",
            directory.display(),
            self.backend.describe(),
            self.timeout.as_secs()
        );

        let worker = ScanWorker {
            backend: Arc::clone(&self.backend),
            session: self.session.clone(),
            timeout: self.timeout,
            keywords: Arc::clone(&self.progress_keywords),
            observer,
            directory,
        };

        let spawned = thread::Builder::new()
            .name("dupewise-scan".to_string())
            .spawn(move || worker.run());

        match spawned {
            Ok(handle) => Ok(ScanJob { handle }),
            Err(e) => {
                self.session.finish(OutcomeKind::Failed, None, None);
                Err(ScanError::Spawn(e))
            }
        }
    }

    /// Validate, run and wait for one scan.
    ///
    /// # Errors
    ///
    /// Any [`ScanError`] from validation. Backend failures are reported in
    /// the returned [`ScanOutcome`], not as errors.
    pub fn run_scan(
        &self,
        directory: Option<&Path>,
        observer: Arc<dyn ScanObserver>,
    ) -> Result<ScanOutcome, ScanError> {
        Ok(self.request_scan(directory, observer)?.wait())
    }
}

struct ScanWorker {
    backend: Arc<dyn Backend>,
    session: SessionHandle,
    timeout: Duration,
    keywords: Arc<Vec<String>>,
    observer: Arc<dyn ScanObserver>,
    directory: PathBuf,
}

impl ScanWorker {
    fn run(self) -> ScanOutcome {
        let mut guard = FinishGuard {
            session: &self.session,
            armed: true,
        };

        let started = Instant::now();
        self.observer.on_started(&self.directory);

        let relay = StatusRelay {
            observer: self.observer.as_ref(),
            keywords: &self.keywords,
            lines: Mutex::new(Vec::new()),
        };
        let result = self.backend.run(&self.directory, self.timeout, &relay);
        let elapsed = started.elapsed();
        let status_lines = relay.into_lines();

        let (outcome, exit_code) = match result {
            Ok(output) if output.success() => match parse_bytes(&output.stdout) {
                Ok(report) => (
                    ScanOutcome::Completed(CompletedScan {
                        groups: Arc::new(GroupModel::new(report.groups)),
                        anomalies: report.anomalies,
                        status_lines,
                        elapsed,
                    }),
                    output.exit_code,
                ),
                Err(e) => (
                    ScanOutcome::Failed(FailedScan {
                        exit_code: output.exit_code,
                        reason: e.to_string(),
                        elapsed,
                    }),
                    output.exit_code,
                ),
            },
            Ok(output) => {
                let reason = match output.stderr.trim() {
                    "" => "backend produced no diagnostics".to_string(),
                    text => text.to_string(),
                };
                (
                    ScanOutcome::Failed(FailedScan {
                        exit_code: output.exit_code,
                        reason,
                        elapsed,
                    }),
                    output.exit_code,
                )
            }
            Err(BackendError::TimedOut { timeout }) => (ScanOutcome::TimedOut { timeout }, None),
            Err(e) => (
                ScanOutcome::Failed(FailedScan {
                    exit_code: None,
                    reason: e.to_string(),
                    elapsed,
                }),
                None,
            ),
        };

        let groups = match &outcome {
            ScanOutcome::Completed(done) => Some(Arc::clone(&done.groups)),
            _ => None,
        };
        self.session.finish(outcome.kind(), exit_code, groups);
        guard.armed = false;

        match &outcome {
            ScanOutcome::Completed(done) => log::info!(
                "Scan completed in {}: {} group(s)",
                format_elapsed(done.elapsed),
                done.groups.raw_groups().len()
            ),
            other => log::error!(
                "{}",
                other.failure_message().unwrap_or_default()
            ),
        }

        self.observer.on_finished(&outcome);
        outcome
    }
}

/// Releases the session if the worker unwinds before finishing it.
struct FinishGuard<'a> {
    session: &'a SessionHandle,
    armed: bool,
}

impl Drop for FinishGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.session.finish(OutcomeKind::Failed, None, None);
        }
    }
}

/// Filters backend diagnostics down to progress lines.
struct StatusRelay<'a> {
    observer: &'a dyn ScanObserver,
    keywords: &'a [String],
    lines: Mutex<Vec<String>>,
}

impl StatusRelay<'_> {
    fn into_lines(self) -> Vec<String> {
        self.lines
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl BackendEvents for StatusRelay<'_> {
    fn on_diagnostic(&self, line: &str) {
        let line = line.trim();
        log::trace!("backend: {line}");
        if line.is_empty() || !is_progress_line(line, self.keywords) {
            return;
        }
        self.observer.on_status(line);
        self.lines
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(line.to_string());
    }

    fn on_tick(&self, elapsed: Duration) {
        self.observer.on_elapsed(elapsed);
    }
}

/// Check if a diagnostic line contains any progress keyword.
#[must_use]
pub fn is_progress_line(line: &str, keywords: &[String]) -> bool {
    keywords.iter().any(|k| !k.is_empty() && line.contains(k.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::backend::BackendOutput;
    use crate::scan::session::ScanState;
    use std::sync::mpsc;
    use tempfile::TempDir;

    /// Backend that replays a canned result.
    struct CannedBackend {
        available: bool,
        stderr_lines: Vec<&'static str>,
        result: fn() -> Result<BackendOutput, BackendError>,
    }

    impl Backend for CannedBackend {
        fn is_available(&self) -> bool {
            self.available
        }

        fn describe(&self) -> String {
            "canned".to_string()
        }

        fn run(
            &self,
            _directory: &Path,
            _timeout: Duration,
            events: &dyn BackendEvents,
        ) -> Result<BackendOutput, BackendError> {
            for line in &self.stderr_lines {
                events.on_diagnostic(line);
            }
            events.on_tick(Duration::from_secs(1));
            (self.result)()
        }
    }

    /// Backend that blocks until the test releases it.
    struct GatedBackend {
        gate: Mutex<mpsc::Receiver<()>>,
    }

    impl Backend for GatedBackend {
        fn is_available(&self) -> bool {
            true
        }

        fn describe(&self) -> String {
            "gated".to_string()
        }

        fn run(
            &self,
            _directory: &Path,
            _timeout: Duration,
            _events: &dyn BackendEvents,
        ) -> Result<BackendOutput, BackendError> {
            let _ = self.gate.lock().unwrap().recv();
            Ok(BackendOutput {
                exit_code: Some(0),
                stdout: b"EXACT|1.0\n/a\n/b\n---GROUP---\n".to_vec(),
                stderr: String::new(),
            })
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        statuses: Mutex<Vec<String>>,
        ticks: Mutex<Vec<Duration>>,
        finished: Mutex<Option<OutcomeKind>>,
    }

    impl ScanObserver for RecordingObserver {
        fn on_elapsed(&self, elapsed: Duration) {
            self.ticks.lock().unwrap().push(elapsed);
        }

        fn on_status(&self, line: &str) {
            self.statuses.lock().unwrap().push(line.to_string());
        }

        fn on_finished(&self, outcome: &ScanOutcome) {
            *self.finished.lock().unwrap() = Some(outcome.kind());
        }
    }

    fn ok_two_groups() -> Result<BackendOutput, BackendError> {
        Ok(BackendOutput {
            exit_code: Some(0),
            stdout: b"EXACT|1.0\n/a\n/b\n---GROUP---\nSIMILAR|0.8\n/c|0.9\n/d|0.7\n---GROUP---\n"
                .to_vec(),
            stderr: "Processed 4 files\nFinding duplicates...\nnoise\nDone\n".to_string(),
        })
    }

    fn ok_empty() -> Result<BackendOutput, BackendError> {
        Ok(BackendOutput {
            exit_code: Some(0),
            stdout: Vec::new(),
            stderr: String::new(),
        })
    }

    fn exit_two() -> Result<BackendOutput, BackendError> {
        Ok(BackendOutput {
            exit_code: Some(2),
            stdout: Vec::new(),
            stderr: "cannot open directory\n".to_string(),
        })
    }

    fn timed_out() -> Result<BackendOutput, BackendError> {
        Err(BackendError::TimedOut {
            timeout: Duration::from_secs(300),
        })
    }

    fn bad_utf8() -> Result<BackendOutput, BackendError> {
        Ok(BackendOutput {
            exit_code: Some(0),
            stdout: vec![0xff, 0xfe, b'\n'],
            stderr: String::new(),
        })
    }

    fn canned(result: fn() -> Result<BackendOutput, BackendError>) -> CannedBackend {
        CannedBackend {
            available: true,
            stderr_lines: vec!["Processed 4 files", "noise", "Calculating similarity"],
            result,
        }
    }

    fn orchestrator(backend: impl Backend + 'static) -> ScanOrchestrator {
        ScanOrchestrator::new(Arc::new(backend), SessionHandle::new())
    }

    #[test]
    fn test_validation_order() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("file.txt");
        std::fs::write(&file, b"x").unwrap();

        let orch = orchestrator(canned(ok_empty));
        assert!(matches!(orch.validate(None), Err(ScanError::NoDirectory)));
        assert!(matches!(
            orch.validate(Some(Path::new(""))),
            Err(ScanError::NoDirectory)
        ));
        assert!(matches!(
            orch.validate(Some(&dir.path().join("missing"))),
            Err(ScanError::DirectoryNotFound(_))
        ));
        assert!(matches!(
            orch.validate(Some(&file)),
            Err(ScanError::NotADirectory(_))
        ));

        let missing_backend = orchestrator(CannedBackend {
            available: false,
            stderr_lines: Vec::new(),
            result: ok_empty,
        });
        assert!(matches!(
            missing_backend.validate(Some(dir.path())),
            Err(ScanError::BackendMissing(_))
        ));
        assert_eq!(missing_backend.session().state(), ScanState::Idle);
    }

    #[test]
    fn test_completed_scan_replaces_model() {
        let dir = TempDir::new().unwrap();
        let orch = orchestrator(canned(ok_two_groups));
        let observer = Arc::new(RecordingObserver::default());

        let outcome = orch.run_scan(Some(dir.path()), observer.clone()).unwrap();

        let ScanOutcome::Completed(done) = outcome else {
            panic!("expected completion");
        };
        assert_eq!(done.groups.raw_groups().len(), 2);
        assert_eq!(
            done.status_lines,
            vec!["Processed 4 files", "Calculating similarity"]
        );
        assert_eq!(*observer.statuses.lock().unwrap(), done.status_lines);
        assert_eq!(observer.ticks.lock().unwrap().len(), 1);
        assert_eq!(
            *observer.finished.lock().unwrap(),
            Some(OutcomeKind::Completed)
        );

        let session = orch.session().snapshot();
        assert_eq!(session.state(), ScanState::Idle);
        assert_eq!(session.groups.exact_group_count(), 1);
        assert_eq!(session.groups.similar_group_count(), 1);
        assert_eq!(session.last_backend_exit_code, Some(0));
    }

    #[test]
    fn test_empty_output_means_no_duplicates() {
        let dir = TempDir::new().unwrap();
        let orch = orchestrator(canned(ok_empty));

        let outcome = orch
            .run_scan(Some(dir.path()), Arc::new(NoopObserver))
            .unwrap();

        assert!(outcome.is_completed());
        assert!(orch.session().groups().no_duplicates_found());
    }

    #[test]
    fn test_failed_exit_keeps_previous_model() {
        let dir = TempDir::new().unwrap();
        let session = SessionHandle::new();

        let good = ScanOrchestrator::new(Arc::new(canned(ok_two_groups)), session.clone());
        good.run_scan(Some(dir.path()), Arc::new(NoopObserver))
            .unwrap();

        let bad = ScanOrchestrator::new(Arc::new(canned(exit_two)), session.clone());
        let outcome = bad
            .run_scan(Some(dir.path()), Arc::new(NoopObserver))
            .unwrap();

        let ScanOutcome::Failed(failed) = &outcome else {
            panic!("expected failure");
        };
        assert_eq!(failed.exit_code, Some(2));
        assert_eq!(failed.reason, "cannot open directory");
        assert!(outcome
            .failure_message()
            .unwrap()
            .contains("exit 2"));

        let snapshot = session.snapshot();
        assert_eq!(snapshot.groups.raw_groups().len(), 2);
        assert_eq!(snapshot.last_backend_exit_code, Some(2));
        assert_eq!(snapshot.last_outcome, Some(OutcomeKind::Failed));
        assert_eq!(snapshot.state(), ScanState::Idle);
    }

    #[test]
    fn test_timeout_keeps_model_and_reports() {
        let dir = TempDir::new().unwrap();
        let orch = orchestrator(canned(timed_out));

        let outcome = orch
            .run_scan(Some(dir.path()), Arc::new(NoopObserver))
            .unwrap();

        assert_eq!(outcome.kind(), OutcomeKind::TimedOut);
        assert_eq!(
            outcome.failure_message().unwrap(),
            "Scanning timed out after 5m 0s"
        );
        assert_eq!(
            orch.session().snapshot().last_outcome,
            Some(OutcomeKind::TimedOut)
        );
    }

    #[test]
    fn test_undecodable_output_fails() {
        let dir = TempDir::new().unwrap();
        let orch = orchestrator(canned(bad_utf8));

        let outcome = orch
            .run_scan(Some(dir.path()), Arc::new(NoopObserver))
            .unwrap();

        assert_eq!(outcome.kind(), OutcomeKind::Failed);
        assert!(orch.session().groups().raw_groups().is_empty());
    }

    #[test]
    fn test_overlapping_scan_is_rejected() {
        let dir = TempDir::new().unwrap();
        let (release, gate) = mpsc::channel();
        let orch = orchestrator(GatedBackend {
            gate: Mutex::new(gate),
        });

        let job = orch
            .request_scan(Some(dir.path()), Arc::new(NoopObserver))
            .unwrap();
        assert_eq!(orch.session().state(), ScanState::Running);

        let second = orch.request_scan(Some(dir.path()), Arc::new(NoopObserver));
        assert!(matches!(second, Err(ScanError::AlreadyRunning)));

        release.send(()).unwrap();
        let outcome = job.wait();
        assert!(outcome.is_completed());
        assert_eq!(orch.session().state(), ScanState::Idle);

        release.send(()).unwrap();
        let again = orch
            .run_scan(Some(dir.path()), Arc::new(NoopObserver))
            .unwrap();
        assert!(again.is_completed());
    }

    #[test]
    fn test_is_progress_line() {
        let keywords: Vec<String> = Config::default().progress_keywords;
        assert!(is_progress_line("Processed 120 files", &keywords));
        assert!(is_progress_line("[2/3] Finding exact duplicates", &keywords));
        assert!(!is_progress_line("warning: skipped /proc", &keywords));
        assert!(!is_progress_line("anything", &[String::new()]));
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_secs(0)), "0m 0s");
        assert_eq!(format_elapsed(Duration::from_secs(75)), "1m 15s");
        assert_eq!(format_elapsed(Duration::from_millis(300_900)), "5m 0s");
    }
}
