//! CSV output formatter for scan results.
//!
//! One row is generated for each member of a reportable group.
//!
//! # Columns
//!
//! - `group_id`: 1-based group number in backend order
//! - `kind`: `exact` or `similar`
//! - `role`: `keep` or `delete` for exact groups, `review` for similar ones
//! - `path`: Path as reported by the backend
//! - `similarity`: Per-file similarity
//! - `size`: Current size in bytes, empty if the file is gone
//! - `modified`: Last modified time (RFC 3339), `unknown` if unavailable

use std::io;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::duplicates::{GroupKind, GroupModel};

/// Errors that can occur during CSV output generation.
#[derive(Debug, Error)]
pub enum CsvOutputError {
    /// I/O error during writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error during CSV serialization.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Serialize)]
struct CsvRow {
    group_id: usize,
    kind: GroupKind,
    role: &'static str,
    path: String,
    similarity: f64,
    size: Option<u64>,
    modified: String,
}

/// CSV output formatter.
pub struct CsvOutput<'a> {
    model: &'a GroupModel,
}

impl<'a> CsvOutput<'a> {
    /// Create a new CSV output formatter.
    #[must_use]
    pub fn new(model: &'a GroupModel) -> Self {
        Self { model }
    }

    /// Write the CSV output to the given writer.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if writing or serialization fails.
    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<(), CsvOutputError> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        for (idx, group) in self.model.reportable_groups().enumerate() {
            for (pos, member) in group.members.iter().enumerate() {
                let role = match (group.kind, pos) {
                    (GroupKind::Exact, 0) => "keep",
                    (GroupKind::Exact, _) => "delete",
                    (GroupKind::Similar, _) => "review",
                };

                csv_writer.serialize(CsvRow {
                    group_id: idx + 1,
                    kind: group.kind,
                    role,
                    path: member.path.to_string_lossy().into_owned(),
                    similarity: member.similarity,
                    size: member.size_bytes(),
                    modified: get_modified_time(&member.path),
                })?;
            }
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Generate CSV output as a string.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if serialization fails.
    pub fn to_string(&self) -> Result<String, CsvOutputError> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).to_string())
    }
}

/// Formatted modified time for a file, `unknown` if metadata cannot be read.
fn get_modified_time(path: &std::path::Path) -> String {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map(|m| {
            let datetime: DateTime<Utc> = m.into();
            datetime.to_rfc3339()
        })
        .unwrap_or_else(|_| "unknown".to_string())
}
