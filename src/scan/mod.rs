//! Scan orchestration module.
//!
//! This module provides:
//! - The [`Backend`] seam and the child-process implementation
//! - The shared [`SessionHandle`] holding the latest results
//! - The [`ScanOrchestrator`] state machine with timeout and progress relay
//!
//! # Example
//!
//! ```no_run
//! use dupewise::config::Config;
//! use dupewise::scan::{NoopObserver, ScanOrchestrator, SessionHandle};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let orchestrator = ScanOrchestrator::from_config(&Config::default(), SessionHandle::new());
//! let outcome = orchestrator
//!     .run_scan(Some(Path::new("/data")), Arc::new(NoopObserver))
//!     .unwrap();
//! println!("{:?}", outcome.kind());
//! ```

pub mod backend;
pub mod orchestrator;
pub mod session;

pub use backend::{Backend, BackendError, BackendEvents, BackendOutput, ProcessBackend};
pub use orchestrator::{
    format_elapsed, is_progress_line, CompletedScan, FailedScan, NoopObserver, ScanError,
    ScanJob, ScanObserver, ScanOrchestrator, ScanOutcome,
};
pub use session::{OutcomeKind, ScanSession, ScanState, SessionHandle};
