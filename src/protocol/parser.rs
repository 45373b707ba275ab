//! Line-oriented group protocol parser.
//!
//! # Grammar
//!
//! Each line is trimmed, then classified:
//!
//! | Line                     | Meaning                                          |
//! |--------------------------|--------------------------------------------------|
//! | *(blank)*                | ignored                                          |
//! | `EXACT|<sim>`            | open an exact group (`<sim>` defaults to 1.0)     |
//! | `SIMILAR|<sim>`          | open a similar group (`<sim>` defaults to 1.0)    |
//! | `---GROUP---`            | close the current group if it has members        |
//! | `<path>` / `<path>|<sim>`| member; `<sim>` defaults to the group's value    |
//!
//! A non-empty group still open at end of input is kept. Members seen before
//! any header land in an implicit exact group with similarity 1.0.
//!
//! Nothing here fails on odd input: every irregularity becomes a
//! [`ProtocolAnomaly`] in the [`ParseReport`] and parsing continues.
//!
//! # Example
//!
//! ```
//! use dupewise::protocol::parse_groups;
//! use dupewise::duplicates::GroupKind;
//!
//! let groups = parse_groups("EXACT|1.0\n/a\n/b\n---GROUP---\nSIMILAR|0.8\n/c|0.9\n/d|0.7\n");
//! assert_eq!(groups.len(), 2);
//! assert_eq!(groups[0].kind, GroupKind::Exact);
//! assert_eq!(groups[1].members[1].similarity, 0.7);
//! ```

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::duplicates::{DuplicateGroup, FileRecord, GroupKind};

/// Literal line that terminates a group.
pub const GROUP_MARKER: &str = "---GROUP---";

/// Separator between a path (or kind token) and its similarity.
pub const FIELD_SEPARATOR: char = '|';

/// Similarity used when a header carries none.
pub const DEFAULT_SIMILARITY: f64 = 1.0;

/// Errors raised while reading protocol input.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The backend output was not valid UTF-8.
    #[error("backend output is not valid UTF-8 (at byte {valid_up_to})")]
    Decode {
        /// Length of the valid prefix
        valid_up_to: usize,
        #[source]
        source: std::str::Utf8Error,
    },
}

/// Kind of irregularity found in the protocol stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    /// Header similarity missing or unparsable; 1.0 used.
    MalformedHeaderSimilarity,
    /// Member similarity suffix unparsable; whole line taken as the path.
    AmbiguousSeparator,
    /// Similarity outside [0, 1]; clamped.
    SimilarityOutOfRange,
    /// Member before any header; implicit exact group used.
    MissingHeader,
    /// Members after a group marker without a new header.
    HeaderlessGroup,
    /// Header arrived while a group still had members; that group was closed.
    UnterminatedGroup,
    /// A path repeated inside one group; the repeat was dropped.
    DuplicatePath,
    /// A member line that contains the group marker text.
    MarkerLikePath,
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::MalformedHeaderSimilarity => "malformed header similarity",
            Self::AmbiguousSeparator => "ambiguous field separator",
            Self::SimilarityOutOfRange => "similarity out of range",
            Self::MissingHeader => "member before any group header",
            Self::HeaderlessGroup => "group without header",
            Self::UnterminatedGroup => "group not terminated before next header",
            Self::DuplicatePath => "duplicate path in group",
            Self::MarkerLikePath => "path contains group marker",
        };
        f.write_str(text)
    }
}

/// One flagged line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProtocolAnomaly {
    /// 1-based line number in the input
    pub line: usize,
    /// What was irregular
    pub kind: AnomalyKind,
    /// The offending line, trimmed
    pub text: String,
}

impl fmt::Display for ProtocolAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}: {:?}", self.line, self.kind, self.text)
    }
}

/// Result of parsing one backend output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseReport {
    /// Groups in emission order; none is empty
    pub groups: Vec<DuplicateGroup>,
    /// Irregularities that were defaulted
    pub anomalies: Vec<ProtocolAnomaly>,
}

impl ParseReport {
    /// Check if parsing was free of anomalies.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.anomalies.is_empty()
    }
}

/// Parse protocol text into groups, discarding anomaly details.
#[must_use]
pub fn parse_groups(input: &str) -> Vec<DuplicateGroup> {
    parse(input).groups
}

/// Decode raw backend output and parse it.
///
/// # Errors
///
/// Returns [`ProtocolError::Decode`] if `bytes` is not UTF-8. Structural
/// problems never produce an error.
pub fn parse_bytes(bytes: &[u8]) -> Result<ParseReport, ProtocolError> {
    let text = std::str::from_utf8(bytes).map_err(|source| ProtocolError::Decode {
        valid_up_to: source.valid_up_to(),
        source,
    })?;
    Ok(parse(text))
}

/// Parse protocol text into groups plus a list of anomalies.
#[must_use]
pub fn parse(input: &str) -> ParseReport {
    let mut parser = GroupParser::default();
    for (index, raw) in input.lines().enumerate() {
        parser.feed(index + 1, raw);
    }
    let report = parser.finish();

    for anomaly in &report.anomalies {
        log::warn!("Protocol anomaly at {anomaly}");
    }
    log::debug!(
        "Parsed {} group(s), {} anomaly(ies)",
        report.groups.len(),
        report.anomalies.len()
    );

    report
}

/// Header state for the group being accumulated.
#[derive(Debug, Clone, Copy)]
struct Header {
    kind: GroupKind,
    similarity: f64,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            kind: GroupKind::Exact,
            similarity: DEFAULT_SIMILARITY,
        }
    }
}

#[derive(Debug, Default)]
struct GroupParser {
    header: Header,
    seen_header: bool,
    /// A header applies to the current accumulator (reset by the marker).
    header_fresh: bool,
    members: Vec<FileRecord>,
    report: ParseReport,
}

impl GroupParser {
    fn feed(&mut self, line_no: usize, raw: &str) {
        let line = raw.trim();
        if line.is_empty() {
            return;
        }

        if line == GROUP_MARKER {
            self.flush();
            self.header_fresh = false;
            return;
        }

        if let Some(kind) = header_kind(line) {
            self.open_group(line_no, line, kind);
            return;
        }

        self.add_member(line_no, line);
    }

    fn open_group(&mut self, line_no: usize, line: &str, kind: GroupKind) {
        if !self.members.is_empty() {
            self.flag(line_no, AnomalyKind::UnterminatedGroup, line);
            self.flush();
        }

        let raw_similarity = line
            .split_once(FIELD_SEPARATOR)
            .map_or("", |(_, rest)| rest.trim());
        let similarity = match parse_similarity(raw_similarity) {
            Some(value) => self.clamp(line_no, line, value),
            None => {
                self.flag(line_no, AnomalyKind::MalformedHeaderSimilarity, line);
                DEFAULT_SIMILARITY
            }
        };

        self.header = Header { kind, similarity };
        self.seen_header = true;
        self.header_fresh = true;
    }

    fn add_member(&mut self, line_no: usize, line: &str) {
        if !self.header_fresh && self.members.is_empty() {
            let kind = if self.seen_header {
                AnomalyKind::HeaderlessGroup
            } else {
                AnomalyKind::MissingHeader
            };
            self.flag(line_no, kind, line);
        }

        if line.contains(GROUP_MARKER) {
            self.flag(line_no, AnomalyKind::MarkerLikePath, line);
        }

        let (path, similarity) = match line.rsplit_once(FIELD_SEPARATOR) {
            None => (line, self.header.similarity),
            Some((path, suffix)) => {
                let suffix = suffix.trim();
                if suffix.is_empty() {
                    (path, self.header.similarity)
                } else if let Some(value) = parse_similarity(suffix) {
                    (path, self.clamp(line_no, line, value))
                } else {
                    self.flag(line_no, AnomalyKind::AmbiguousSeparator, line);
                    (line, self.header.similarity)
                }
            }
        };

        let path = PathBuf::from(path.trim_end());
        if self.members.iter().any(|m| m.path == path) {
            self.flag(line_no, AnomalyKind::DuplicatePath, line);
            return;
        }

        self.members.push(FileRecord::new(path, similarity));
    }

    fn clamp(&mut self, line_no: usize, line: &str, value: f64) -> f64 {
        if (0.0..=1.0).contains(&value) {
            value
        } else {
            self.flag(line_no, AnomalyKind::SimilarityOutOfRange, line);
            value.clamp(0.0, 1.0)
        }
    }

    fn flush(&mut self) {
        if self.members.is_empty() {
            return;
        }
        let members = std::mem::take(&mut self.members);
        self.report.groups.push(DuplicateGroup::new(
            self.header.kind,
            self.header.similarity,
            members,
        ));
    }

    fn flag(&mut self, line: usize, kind: AnomalyKind, text: &str) {
        self.report.anomalies.push(ProtocolAnomaly {
            line,
            kind,
            text: text.to_string(),
        });
    }

    fn finish(mut self) -> ParseReport {
        self.flush();
        self.report
    }
}

fn header_kind(line: &str) -> Option<GroupKind> {
    let (token, _) = line.split_once(FIELD_SEPARATOR)?;
    [GroupKind::Exact, GroupKind::Similar]
        .into_iter()
        .find(|kind| kind.token() == token)
}

/// Parse a similarity field. Non-finite values count as unparsable.
fn parse_similarity(field: &str) -> Option<f64> {
    field.parse::<f64>().ok().filter(|v| v.is_finite())
}
