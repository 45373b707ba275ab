//! The scan session shared between the orchestrator and its readers.
//!
//! A [`ScanSession`] is an immutable snapshot. Every transition builds a new
//! snapshot and swaps it into the [`SessionHandle`], so a reader holding an
//! `Arc<ScanSession>` always sees one consistent state and never a partially
//! parsed model.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::duplicates::GroupModel;
use crate::scan::orchestrator::ScanError;

/// Coarse state of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanState {
    /// No scan in flight
    Idle,
    /// A backend invocation is running
    Running,
}

/// How the most recent scan ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    /// Backend exited 0 and its output replaced the model
    Completed,
    /// Launch failure, non-zero exit or undecodable output
    Failed,
    /// Backend exceeded the ceiling and was killed
    TimedOut,
}

/// Snapshot of one session.
#[derive(Debug, Clone, Default)]
pub struct ScanSession {
    /// A scan is in flight
    pub running: bool,
    /// When the current or last scan started
    pub started_at: Option<DateTime<Utc>>,
    /// Directory of the current or last scan
    pub directory: Option<PathBuf>,
    /// Last successfully parsed model
    pub groups: Arc<GroupModel>,
    /// Exit code of the last finished backend process
    pub last_backend_exit_code: Option<i32>,
    /// How the last scan ended
    pub last_outcome: Option<OutcomeKind>,
    started: Option<Instant>,
}

impl ScanSession {
    /// Current coarse state.
    #[must_use]
    pub fn state(&self) -> ScanState {
        if self.running {
            ScanState::Running
        } else {
            ScanState::Idle
        }
    }

    /// Time since the current scan started, while one is running.
    #[must_use]
    pub fn elapsed(&self) -> Option<Duration> {
        if self.running {
            self.started.map(|s| s.elapsed())
        } else {
            None
        }
    }
}

/// Shared handle to the single session of an orchestrator.
///
/// Cloning the handle shares the session.
#[derive(Debug, Clone, Default)]
pub struct SessionHandle {
    current: Arc<Mutex<Arc<ScanSession>>>,
}

impl SessionHandle {
    /// Fresh idle session with no results.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Arc<ScanSession>> {
        // Snapshots are swapped whole, so a poisoned guard still holds a
        // consistent value.
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<ScanSession> {
        Arc::clone(&self.lock())
    }

    /// Current coarse state.
    #[must_use]
    pub fn state(&self) -> ScanState {
        self.lock().state()
    }

    /// Current group model.
    #[must_use]
    pub fn groups(&self) -> Arc<GroupModel> {
        Arc::clone(&self.lock().groups)
    }

    /// Mark a scan as running.
    ///
    /// Previous results stay visible until the scan completes.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::AlreadyRunning`] if a scan is in flight; the
    /// session is left untouched.
    pub fn begin(&self, directory: &Path) -> Result<(), ScanError> {
        let mut current = self.lock();
        if current.running {
            return Err(ScanError::AlreadyRunning);
        }

        let next = ScanSession {
            running: true,
            started_at: Some(Utc::now()),
            directory: Some(directory.to_path_buf()),
            groups: Arc::clone(&current.groups),
            last_backend_exit_code: current.last_backend_exit_code,
            last_outcome: current.last_outcome,
            started: Some(Instant::now()),
        };
        *current = Arc::new(next);
        Ok(())
    }

    /// Record the end of a scan. `groups` replaces the model only when given.
    pub fn finish(
        &self,
        outcome: OutcomeKind,
        exit_code: Option<i32>,
        groups: Option<Arc<GroupModel>>,
    ) {
        let mut current = self.lock();
        let replaced = groups.is_some();

        let next = ScanSession {
            running: false,
            started_at: current.started_at,
            directory: current.directory.clone(),
            groups: groups.unwrap_or_else(|| Arc::clone(&current.groups)),
            last_backend_exit_code: exit_code,
            last_outcome: Some(outcome),
            started: None,
        };
        *current = Arc::new(next);

        log::debug!("Session finished: {outcome:?} (exit {exit_code:?}, model replaced: {replaced})");
    }

    /// Drop all results.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::AlreadyRunning`] while a scan is in flight.
    pub fn clear(&self) -> Result<(), ScanError> {
        let mut current = self.lock();
        if current.running {
            return Err(ScanError::AlreadyRunning);
        }
        *current = Arc::new(ScanSession::default());
        Ok(())
    }
}
