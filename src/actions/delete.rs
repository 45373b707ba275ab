//! Permanent file removal with per-file error collection.
//!
//! # Overview
//!
//! Files are removed directly from the file system; there is no trash or
//! undo. Batch removal treats every path as an independent attempt: a failure
//! is recorded and the batch moves on to the next path.
//!
//! # Example
//!
//! ```no_run
//! use dupewise::actions::delete::permanent_delete;
//! use std::path::PathBuf;
//!
//! let path = PathBuf::from("/path/to/duplicate.txt");
//! match permanent_delete(&path) {
//!     Ok(result) => println!("Deleted: {}", result.path.display()),
//!     Err(e) => eprintln!("Failed: {}", e),
//! }
//! ```

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Error type for deletion operations.
#[derive(Debug, Error)]
pub enum DeleteError {
    /// File was not found (may have been deleted or moved since the scan).
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied when attempting to delete.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The path names a directory; only files are removed.
    #[error("path is a directory: {0}")]
    IsDirectory(PathBuf),

    /// Attempted to delete all copies (at least one must be preserved).
    #[error("cannot delete all copies - at least one file must be preserved")]
    AllCopiesWouldBeDeleted,

    /// Any other I/O failure.
    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DeleteError {
    /// Get the path associated with this error (if any).
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::NotFound(p)
            | Self::PermissionDenied(p)
            | Self::IsDirectory(p)
            | Self::Io { path: p, .. } => Some(p),
            Self::AllCopiesWouldBeDeleted => None,
        }
    }

    fn from_io(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: err,
            },
        }
    }
}

/// A file that was removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteResult {
    /// Path that was deleted.
    pub path: PathBuf,
    /// Size of the deleted file in bytes.
    pub size: u64,
}

/// Outcome of a batch removal.
#[derive(Debug, Clone, Default)]
pub struct DeletionReport {
    /// Successfully deleted files.
    pub successes: Vec<DeleteResult>,
    /// Failed deletions with their reasons.
    pub failures: Vec<(PathBuf, String)>,
    /// Total bytes freed.
    pub bytes_freed: u64,
}

impl DeletionReport {
    /// Number of files removed.
    #[must_use]
    pub fn deleted_count(&self) -> usize {
        self.successes.len()
    }

    /// Number of files that could not be removed.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Check if all deletions succeeded.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    /// Human-readable summary of the operation.
    #[must_use]
    pub fn summary(&self) -> String {
        let freed = bytesize::ByteSize::b(self.bytes_freed);
        if self.all_succeeded() {
            format!("Deleted {} file(s), freed {}", self.deleted_count(), freed)
        } else {
            format!(
                "Deleted {} file(s), {} failed, freed {}",
                self.deleted_count(),
                self.failure_count(),
                freed
            )
        }
    }
}

/// Callback trait for deletion progress reporting.
pub trait DeleteProgressCallback: Send + Sync {
    /// Called before each file deletion.
    fn on_before_delete(&self, path: &Path, index: usize, total: usize);

    /// Called after successful deletion.
    fn on_delete_success(&self, path: &Path, size: u64);

    /// Called after failed deletion.
    fn on_delete_failure(&self, path: &Path, error: &str);

    /// Called when batch operation completes.
    fn on_complete(&self, report: &DeletionReport);
}

/// Permanently delete a single file.
///
/// **WARNING**: This operation cannot be undone.
///
/// # Errors
///
/// - `NotFound` if the file doesn't exist
/// - `PermissionDenied` if deletion is not allowed
/// - `IsDirectory` if the path is a directory
/// - `Io` for any other failure
pub fn permanent_delete(path: &Path) -> Result<DeleteResult, DeleteError> {
    let metadata = fs::symlink_metadata(path).map_err(|e| DeleteError::from_io(path, e))?;

    if metadata.is_dir() {
        return Err(DeleteError::IsDirectory(path.to_path_buf()));
    }

    let size = metadata.len();

    fs::remove_file(path).map_err(|e| {
        log::error!("Delete failed for {}: {}", path.display(), e);
        DeleteError::from_io(path, e)
    })?;

    log::info!("Deleted: {} ({} bytes)", path.display(), size);

    Ok(DeleteResult {
        path: path.to_path_buf(),
        size,
    })
}

/// Delete every path, continuing past failures.
///
/// Each path is an independent attempt. Callers are responsible for keeping
/// at least one file of each duplicate group out of `paths`.
///
/// # Example
///
/// ```no_run
/// use dupewise::actions::delete::{delete_batch, DeleteProgressCallback, DeletionReport};
/// use std::path::{Path, PathBuf};
///
/// struct NoCallback;
/// impl DeleteProgressCallback for NoCallback {
///     fn on_before_delete(&self, _: &Path, _: usize, _: usize) {}
///     fn on_delete_success(&self, _: &Path, _: u64) {}
///     fn on_delete_failure(&self, _: &Path, _: &str) {}
///     fn on_complete(&self, _: &DeletionReport) {}
/// }
///
/// let paths = vec![PathBuf::from("/dup1.txt"), PathBuf::from("/dup2.txt")];
/// let report = delete_batch::<NoCallback>(&paths, None);
/// println!("{}", report.summary());
/// ```
pub fn delete_batch<C: DeleteProgressCallback + ?Sized>(
    paths: &[PathBuf],
    callback: Option<&C>,
) -> DeletionReport {
    let mut report = DeletionReport::default();
    let total = paths.len();

    for (index, path) in paths.iter().enumerate() {
        if let Some(cb) = callback {
            cb.on_before_delete(path, index, total);
        }

        match permanent_delete(path) {
            Ok(deleted) => {
                report.bytes_freed += deleted.size;
                if let Some(cb) = callback {
                    cb.on_delete_success(path, deleted.size);
                }
                report.successes.push(deleted);
            }
            Err(e) => {
                let reason = e.to_string();
                log::warn!("Failed to delete {}: {}", path.display(), reason);
                if let Some(cb) = callback {
                    cb.on_delete_failure(path, &reason);
                }
                report.failures.push((path.clone(), reason));
            }
        }
    }

    if let Some(cb) = callback {
        cb.on_complete(&report);
    }

    log::info!("{}", report.summary());

    report
}

/// Validate that a selection leaves at least one file of a group in place.
///
/// # Errors
///
/// Returns `AllCopiesWouldBeDeleted` if every group path is selected.
///
/// # Example
///
/// ```
/// use dupewise::actions::delete::validate_preserves_copy;
/// use std::path::PathBuf;
///
/// let group = vec![PathBuf::from("/original.txt"), PathBuf::from("/copy.txt")];
///
/// assert!(validate_preserves_copy(&[PathBuf::from("/copy.txt")], &group).is_ok());
/// assert!(validate_preserves_copy(&group, &group).is_err());
/// ```
pub fn validate_preserves_copy(
    selected_paths: &[PathBuf],
    group_paths: &[PathBuf],
) -> Result<(), DeleteError> {
    let selected: HashSet<&PathBuf> = selected_paths.iter().collect();
    let preserved = group_paths.iter().filter(|p| !selected.contains(p)).count();

    if preserved == 0 {
        log::error!(
            "Selection would delete all {} copies of a duplicate group",
            group_paths.len()
        );
        Err(DeleteError::AllCopiesWouldBeDeleted)
    } else {
        Ok(())
    }
}
