//! Progress reporting utilities using indicatif.
//!
//! - [`ScanProgress`] shows a spinner with the elapsed time and the latest
//!   backend status line while a scan runs.
//! - [`DeleteProgress`] shows a bar while duplicate files are removed.
//!
//! Both are silent in quiet mode. The backend reports no completion
//! percentage, so the scan spinner has no length.

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::actions::{DeleteProgressCallback, DeletionReport};
use crate::scan::{format_elapsed, ScanObserver, ScanOutcome};

/// Spinner for a running scan.
pub struct ScanProgress {
    bar: Mutex<Option<ProgressBar>>,
    status: Mutex<String>,
    quiet: bool,
}

impl ScanProgress {
    /// Create a new scan spinner.
    ///
    /// # Examples
    ///
    /// ```
    /// use dupewise::progress::ScanProgress;
    ///
    /// let progress = ScanProgress::new(true);
    /// assert!(progress.status().is_empty());
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            status: Mutex::new(String::new()),
            quiet,
        }
    }

    /// Latest backend status line.
    #[must_use]
    pub fn status(&self) -> String {
        self.status.lock().map(|s| s.clone()).unwrap_or_default()
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} [{prefix}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(ref pb) = *guard {
                f(pb);
            }
        }
    }
}

impl ScanObserver for ScanProgress {
    fn on_started(&self, directory: &Path) {
        if self.quiet {
            return;
        }

        let pb = ProgressBar::new_spinner();
        pb.set_style(Self::spinner_style());
        pb.set_prefix(format_elapsed(Duration::ZERO));
        pb.set_message(format!("Scanning {}", directory.display()));
        pb.enable_steady_tick(Duration::from_millis(100));
        if let Ok(mut bar) = self.bar.lock() {
            *bar = Some(pb);
        }
    }

    fn on_elapsed(&self, elapsed: Duration) {
        self.with_bar(|pb| pb.set_prefix(format_elapsed(elapsed)));
    }

    fn on_status(&self, line: &str) {
        if let Ok(mut status) = self.status.lock() {
            *status = line.to_string();
        }
        self.with_bar(|pb| pb.set_message(line.to_string()));
    }

    fn on_finished(&self, outcome: &ScanOutcome) {
        let Some(pb) = self.bar.lock().ok().and_then(|mut bar| bar.take()) else {
            return;
        };
        match outcome {
            ScanOutcome::Completed(done) => pb.finish_with_message(format!(
                "Scan complete in {}",
                format_elapsed(done.elapsed)
            )),
            _ => pb.abandon_with_message("Scan did not complete"),
        }
    }
}

/// Bar for a deletion batch.
pub struct DeleteProgress {
    bar: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

impl DeleteProgress {
    /// Create a new deletion bar.
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            quiet,
        }
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template("[{elapsed_precise}] [{bar:40.red/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█>-")
    }
}

impl DeleteProgressCallback for DeleteProgress {
    fn on_before_delete(&self, path: &Path, _index: usize, total: usize) {
        if self.quiet {
            return;
        }
        let Ok(mut guard) = self.bar.lock() else {
            return;
        };
        let pb = guard.get_or_insert_with(|| {
            let pb = ProgressBar::new(total as u64);
            pb.set_style(Self::bar_style());
            pb
        });
        pb.set_message(truncate_path(&path.display().to_string(), 40));
    }

    fn on_delete_success(&self, _path: &Path, _size: u64) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(ref pb) = *guard {
                pb.inc(1);
            }
        }
    }

    fn on_delete_failure(&self, path: &Path, error: &str) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(ref pb) = *guard {
                pb.inc(1);
                pb.println(format!("Failed to delete {}: {}", path.display(), error));
            }
        }
    }

    fn on_complete(&self, report: &DeletionReport) {
        if let Some(pb) = self.bar.lock().ok().and_then(|mut bar| bar.take()) {
            pb.finish_with_message(report.summary());
        }
    }
}

/// Truncate a path for display in the progress bar.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.chars().count() <= max_len {
        return path.to_string();
    }

    let file_name = Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let name_len = file_name.chars().count();
    if name_len + 4 > max_len {
        let tail: String = file_name.chars().skip(name_len + 3 - max_len).collect();
        return format!("...{tail}");
    }

    format!(".../{file_name}")
}
