//! External scanner backend invocation.
//!
//! The backend is a black box run as `<executable> [args...] <directory> --similar`.
//! Exit code 0 means stdout carries protocol text; anything else is a
//! failure explained on stderr.
//!
//! [`ProcessBackend::run`] drains both pipes on helper threads so a chatty
//! backend can never block on a full pipe, forwards every stderr line as it
//! arrives, and kills the process once the wall-clock ceiling passes.

use std::ffi::OsString;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

/// Flag passed after the directory to request similar-file grouping.
pub const SIMILAR_FLAG: &str = "--similar";

/// How often the wait loop wakes up to check for exit and timeout.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Errors from running the backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The process could not be started.
    #[error("failed to launch backend {path}: {source}")]
    Launch {
        /// Executable that failed to start
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The ceiling passed; the process was killed.
    #[error("backend did not finish within {}s and was terminated", .timeout.as_secs())]
    TimedOut {
        /// Ceiling that was exceeded
        timeout: Duration,
    },

    /// Waiting on the process failed.
    #[error("I/O error while waiting for backend: {0}")]
    Io(#[from] io::Error),
}

/// Captured result of a finished backend process.
#[derive(Debug, Clone, Default)]
pub struct BackendOutput {
    /// Exit code; `None` if the process was terminated by a signal
    pub exit_code: Option<i32>,
    /// Raw stdout (protocol text on success)
    pub stdout: Vec<u8>,
    /// Stderr, lossily decoded
    pub stderr: String,
}

impl BackendOutput {
    /// Check if the process exited with status 0.
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Live notifications while a backend runs.
pub trait BackendEvents {
    /// A line was written to stderr.
    fn on_diagnostic(&self, line: &str);

    /// Roughly one second more has elapsed.
    fn on_tick(&self, elapsed: Duration);
}

/// A way to run one scan of a directory.
pub trait Backend: Send + Sync {
    /// Whether the backend can be launched at all.
    fn is_available(&self) -> bool;

    /// Short description for messages.
    fn describe(&self) -> String;

    /// Run the backend against `directory`, enforcing `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::TimedOut`] after killing the process, or a
    /// launch / I/O error. A non-zero exit is **not** an error here.
    fn run(
        &self,
        directory: &Path,
        timeout: Duration,
        events: &dyn BackendEvents,
    ) -> Result<BackendOutput, BackendError>;
}

/// Runs the scanner as a child process.
#[derive(Debug, Clone)]
pub struct ProcessBackend {
    executable: PathBuf,
    leading_args: Vec<OsString>,
}

impl ProcessBackend {
    /// Backend that runs `executable <directory> --similar`.
    #[must_use]
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            leading_args: Vec::new(),
        }
    }

    /// Insert arguments before the directory, e.g. a script for an
    /// interpreter executable.
    #[must_use]
    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }
}

impl Backend for ProcessBackend {
    fn is_available(&self) -> bool {
        self.executable.is_file()
    }

    fn describe(&self) -> String {
        self.executable.display().to_string()
    }

    fn run(
        &self,
        directory: &Path,
        timeout: Duration,
        events: &dyn BackendEvents,
    ) -> Result<BackendOutput, BackendError> {
        let started = Instant::now();

        log::debug!(
            "Launching {} {:?} {} {}",
            self.executable.display(),
            self.leading_args,
            directory.display(),
            SIMILAR_FLAG
        );

        let mut child = Command::new(&self.executable)
            .args(&self.leading_args)
            .arg(directory)
            .arg(SIMILAR_FLAG)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| BackendError::Launch {
                path: self.executable.clone(),
                source,
            })?;

        let stdout_pipe = child.stdout.take();
        let stdout_reader = thread::spawn(move || {
            let mut buf = Vec::new();
            if let Some(mut pipe) = stdout_pipe {
                if let Err(e) = pipe.read_to_end(&mut buf) {
                    log::warn!("Failed reading backend stdout: {e}");
                }
            }
            buf
        });

        let (line_tx, line_rx) = mpsc::channel::<String>();
        let stderr_pipe = child.stderr.take();
        let stderr_reader = thread::spawn(move || {
            let mut collected = String::new();
            let Some(pipe) = stderr_pipe else {
                return collected;
            };
            let mut reader = BufReader::new(pipe);
            let mut raw = Vec::new();
            loop {
                raw.clear();
                match reader.read_until(b'\n', &mut raw) {
                    Ok(0) => break,
                    Ok(_) => {
                        let line = String::from_utf8_lossy(&raw);
                        let line = line.trim_end_matches(['\r', '\n']);
                        collected.push_str(line);
                        collected.push('\n');
                        // Receiver may be gone after a timeout.
                        let _ = line_tx.send(line.to_string());
                    }
                    Err(e) => {
                        log::warn!("Failed reading backend stderr: {e}");
                        break;
                    }
                }
            }
            collected
        });

        let mut next_tick = 1u64;
        let status = loop {
            match line_rx.recv_timeout(POLL_INTERVAL) {
                Ok(line) => events.on_diagnostic(&line),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => thread::sleep(POLL_INTERVAL),
            }

            if let Some(status) = child.try_wait()? {
                break status;
            }

            let elapsed = started.elapsed();
            if elapsed >= timeout {
                log::warn!(
                    "Backend exceeded {}s, terminating pid {}",
                    timeout.as_secs(),
                    child.id()
                );
                if let Err(e) = child.kill() {
                    log::warn!("Failed to kill backend: {e}");
                }
                // Reap so no zombie is left behind. Reader threads are
                // detached and end when the pipes close.
                let _ = child.wait();
                return Err(BackendError::TimedOut { timeout });
            }

            if elapsed.as_secs() >= next_tick {
                events.on_tick(elapsed);
                next_tick = elapsed.as_secs() + 1;
            }
        };

        let stdout = stdout_reader.join().unwrap_or_default();
        let stderr = stderr_reader.join().unwrap_or_default();
        for line in line_rx.try_iter() {
            events.on_diagnostic(&line);
        }

        log::debug!(
            "Backend exited with {:?} after {:.1}s ({} bytes stdout)",
            status.code(),
            started.elapsed().as_secs_f64(),
            stdout.len()
        );

        Ok(BackendOutput {
            exit_code: status.code(),
            stdout,
            stderr,
        })
    }
}
