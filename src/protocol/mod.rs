//! Scanner backend wire protocol.
//!
//! The backend writes newline-delimited UTF-8 to stdout:
//!
//! ```text
//! EXACT|1.0
//! /path/a.txt
//! /path/b.txt
//! ---GROUP---
//! SIMILAR|0.85
//! /path/c.docx|0.9
//! /path/d.docx|0.8
//! ---GROUP---
//! ```
//!
//! [`parser`] turns that text into [`crate::duplicates::DuplicateGroup`]s.

pub mod parser;

pub use parser::{
    parse, parse_bytes, parse_groups, AnomalyKind, ParseReport, ProtocolAnomaly, ProtocolError,
    DEFAULT_SIMILARITY, FIELD_SEPARATOR, GROUP_MARKER,
};
