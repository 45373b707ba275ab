//! JSON output formatter for scan results.
//!
//! Provides machine-readable JSON output for scripting and automation.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "groups": [
//!     {
//!       "kind": "exact",
//!       "declared_similarity": 1.0,
//!       "files": [
//!         { "path": "/a", "similarity": 1.0, "size": 1024, "keeper": true },
//!         { "path": "/b", "similarity": 1.0, "size": 1024, "keeper": false }
//!       ]
//!     }
//!   ],
//!   "anomalies": [],
//!   "summary": {
//!     "exact_groups": 1,
//!     "similar_groups": 0,
//!     "exact_duplicate_files": 1,
//!     "similar_files": 0,
//!     "singleton_groups": 0,
//!     "reclaimable_bytes": 1024,
//!     "exit_code": 0,
//!     "exit_code_name": "DW000",
//!     "generated_at": "2024-01-01T00:00:00Z"
//!   }
//! }
//! ```
//!
//! Singleton groups are left out of `groups` and only counted.

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::duplicates::{DuplicateGroup, GroupKind, GroupModel, ModelSummary};
use crate::error::ExitCode;
use crate::protocol::ProtocolAnomaly;

/// A single file in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonFile {
    /// Path as reported by the backend
    pub path: String,
    /// Per-file similarity
    pub similarity: f64,
    /// Current size in bytes, `null` if the file is gone
    pub size: Option<u64>,
    /// Whether this file is retained by deletion
    pub keeper: bool,
}

/// A single group in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonGroup {
    /// `exact` or `similar`
    pub kind: GroupKind,
    /// Similarity from the header line
    pub declared_similarity: f64,
    /// Members in backend order
    pub files: Vec<JsonFile>,
}

impl JsonGroup {
    /// Create a JSON group from a [`DuplicateGroup`].
    #[must_use]
    pub fn from_group(group: &DuplicateGroup) -> Self {
        Self {
            kind: group.kind,
            declared_similarity: group.declared_similarity,
            files: group
                .members
                .iter()
                .enumerate()
                .map(|(idx, m)| JsonFile {
                    path: m.path.to_string_lossy().into_owned(),
                    similarity: m.similarity,
                    size: m.size_bytes(),
                    keeper: group.is_exact() && idx == 0,
                })
                .collect(),
        }
    }
}

/// Summary statistics in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Model aggregates
    #[serde(flatten)]
    pub model: ModelSummary,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "DW000")
    pub exit_code_name: String,
    /// When this report was produced
    pub generated_at: DateTime<Utc>,
}

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// Reportable groups in backend order
    pub groups: Vec<JsonGroup>,
    /// Protocol irregularities found while parsing
    pub anomalies: Vec<ProtocolAnomaly>,
    /// Summary statistics
    pub summary: JsonSummary,
}

impl JsonOutput {
    /// Create a new JSON output from a model, its parse anomalies and the
    /// exit code of this run.
    ///
    /// # Example
    ///
    /// ```
    /// use dupewise::duplicates::GroupModel;
    /// use dupewise::error::ExitCode;
    /// use dupewise::output::JsonOutput;
    ///
    /// let output = JsonOutput::new(&GroupModel::empty(), &[], ExitCode::NoDuplicates);
    /// assert!(output.groups.is_empty());
    /// assert_eq!(output.summary.exit_code, 2);
    /// ```
    #[must_use]
    pub fn new(model: &GroupModel, anomalies: &[ProtocolAnomaly], exit_code: ExitCode) -> Self {
        Self {
            groups: model.reportable_groups().map(JsonGroup::from_group).collect(),
            anomalies: anomalies.to_vec(),
            summary: JsonSummary {
                model: model.summary(),
                exit_code: exit_code.as_i32(),
                exit_code_name: exit_code.code_prefix().to_string(),
                generated_at: Utc::now(),
            },
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
