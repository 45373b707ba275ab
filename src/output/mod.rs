//! Output formatters for scan results.
//!
//! This module provides different output formats for a [`GroupModel`]:
//! - Text for the terminal, optionally colored
//! - JSON for automation and scripting
//! - CSV for spreadsheet import
//!
//! # Example
//!
//! ```
//! use dupewise::duplicates::GroupModel;
//! use dupewise::output::TextOutput;
//! use dupewise::protocol::parse;
//!
//! let report = parse("EXACT|1.0\n/a\n/b\n---GROUP---\n");
//! let model = GroupModel::new(report.groups);
//! let text = TextOutput::new(&model, &report.anomalies, false).render();
//! assert!(text.contains("delete /b"));
//! ```
//!
//! [`GroupModel`]: crate::duplicates::GroupModel

pub mod csv;
pub mod json;
pub mod text;

// Re-export main types
pub use self::csv::CsvOutput;
pub use json::JsonOutput;
pub use text::{render_deletion_report, TextOutput};
