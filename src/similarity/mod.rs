//! Content similarity scoring for office documents.
//!
//! Each scorer maps a pair of files to a score in `[0, 1]`; a pair is
//! similar when the score is strictly greater than the kind's threshold.
//!
//! | Kind           | Extensions                   | Method               | Threshold |
//! |----------------|------------------------------|----------------------|-----------|
//! | Spreadsheet    | xlsx, xlsm, xlsb, xls, ods   | cell-by-cell grids   | 0.70      |
//! | Word-processor | docx                         | word overlap         | 0.60      |
//! | Presentation   | pptx                         | word overlap         | 0.60      |
//!
//! Read failures are reported as [`ComparisonOutcome::Failed`], distinct
//! from a dissimilar verdict. Scorers hold no state, so batches run in
//! parallel.

pub mod extract;
pub mod tabular;
pub mod text;

use std::fmt;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;

pub use extract::{DocumentError, DocumentExtractor};
pub use tabular::{compare_workbooks, sheet_score, workbook_score, SheetGrid, Workbook};
pub use text::{set_overlap, tokenize, word_overlap};

/// Score above which two spreadsheets are similar.
pub const SPREADSHEET_THRESHOLD: f64 = 0.7;

/// Score above which two Word or presentation documents are similar.
pub const TEXT_THRESHOLD: f64 = 0.6;

/// Document families with a dedicated scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Workbooks compared cell by cell
    Spreadsheet,
    /// Word documents compared by word overlap
    WordProcessor,
    /// Slide decks compared by word overlap
    Presentation,
}

impl DocumentKind {
    /// Detect the kind from a file extension (case-insensitive).
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_lowercase();
        match extension.as_str() {
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(Self::Spreadsheet),
            "docx" => Some(Self::WordProcessor),
            "pptx" => Some(Self::Presentation),
            _ => None,
        }
    }

    /// Similarity threshold for this kind.
    #[must_use]
    pub fn threshold(self) -> f64 {
        match self {
            Self::Spreadsheet => SPREADSHEET_THRESHOLD,
            Self::WordProcessor | Self::Presentation => TEXT_THRESHOLD,
        }
    }

    /// Score two files of this kind.
    ///
    /// # Errors
    ///
    /// Returns a [`DocumentError`] if either file cannot be read.
    pub fn score(self, a: &Path, b: &Path) -> Result<f64, DocumentError> {
        match self {
            Self::Spreadsheet => compare_workbooks(a, b),
            Self::WordProcessor => Ok(word_overlap(
                &DocumentExtractor::extract_docx(a)?,
                &DocumentExtractor::extract_docx(b)?,
            )),
            Self::Presentation => Ok(word_overlap(
                &DocumentExtractor::extract_pptx(a)?,
                &DocumentExtractor::extract_pptx(b)?,
            )),
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spreadsheet => write!(f, "spreadsheet"),
            Self::WordProcessor => write!(f, "word"),
            Self::Presentation => write!(f, "presentation"),
        }
    }
}

/// Verdict of one comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum ComparisonOutcome {
    /// Score strictly above the threshold
    Similar {
        /// Score in `[0, 1]`
        score: f64,
    },
    /// Score at or below the threshold
    Dissimilar {
        /// Score in `[0, 1]`
        score: f64,
    },
    /// A file could not be read or the kind is unknown
    Failed {
        /// What went wrong
        reason: String,
    },
}

impl ComparisonOutcome {
    /// Classify a score against a threshold.
    #[must_use]
    pub fn from_score(score: f64, threshold: f64) -> Self {
        if score > threshold {
            Self::Similar { score }
        } else {
            Self::Dissimilar { score }
        }
    }

    /// Check if the pair was judged similar.
    #[must_use]
    pub fn is_similar(&self) -> bool {
        matches!(self, Self::Similar { .. })
    }

    /// Score, if one was computed.
    #[must_use]
    pub fn score(&self) -> Option<f64> {
        match self {
            Self::Similar { score } | Self::Dissimilar { score } => Some(*score),
            Self::Failed { .. } => None,
        }
    }

    /// Process exit code: 0 when similar, 1 otherwise.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(!self.is_similar())
    }
}

impl fmt::Display for ComparisonOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Similar { score } => write!(f, "similar ({score:.3})"),
            Self::Dissimilar { score } => write!(f, "not similar ({score:.3})"),
            Self::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}

/// Two files to compare, with an optional explicit kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPair {
    /// First file
    pub left: PathBuf,
    /// Second file
    pub right: PathBuf,
    /// Kind override; detected from the first file's extension when `None`
    pub kind: Option<DocumentKind>,
}

impl DocumentPair {
    /// Pair with kind detection.
    #[must_use]
    pub fn new(left: impl Into<PathBuf>, right: impl Into<PathBuf>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
            kind: None,
        }
    }

    /// Force a document kind.
    #[must_use]
    pub fn with_kind(mut self, kind: DocumentKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Explicit kind, else the kind of the first file.
    #[must_use]
    pub fn resolved_kind(&self) -> Option<DocumentKind> {
        self.kind.or_else(|| DocumentKind::from_path(&self.left))
    }
}

/// Result of comparing one pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    /// First file
    pub left: PathBuf,
    /// Second file
    pub right: PathBuf,
    /// Kind used, if one could be determined
    pub kind: Option<DocumentKind>,
    /// Verdict
    #[serde(flatten)]
    pub outcome: ComparisonOutcome,
}

/// Compare one pair of documents.
#[must_use]
pub fn compare(pair: &DocumentPair) -> Comparison {
    let kind = pair.resolved_kind();
    let outcome = match kind {
        None => ComparisonOutcome::Failed {
            reason: format!(
                "cannot determine document kind of {}",
                pair.left.display()
            ),
        },
        Some(kind) => match kind.score(&pair.left, &pair.right) {
            Ok(score) => ComparisonOutcome::from_score(score, kind.threshold()),
            Err(e) => {
                log::warn!("{e}");
                ComparisonOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        },
    };

    log::debug!(
        "{} vs {}: {}",
        pair.left.display(),
        pair.right.display(),
        outcome
    );

    Comparison {
        left: pair.left.clone(),
        right: pair.right.clone(),
        kind,
        outcome,
    }
}

/// Compare many pairs in parallel, preserving input order.
#[must_use]
pub fn compare_pairs(pairs: &[DocumentPair]) -> Vec<Comparison> {
    pairs.par_iter().map(compare).collect()
}

/// A malformed line in a pair list.
#[derive(Debug, Error)]
#[error("line {line}: expected two tab-separated paths, found {text:?}")]
pub struct PairListError {
    /// 1-based line number
    pub line: usize,
    /// The offending line
    pub text: String,
}

/// Parse a pair list: one `left<TAB>right` pair per line.
///
/// Blank lines and lines starting with `#` are skipped.
///
/// # Errors
///
/// Returns [`PairListError`] for the first line that does not hold exactly
/// two non-empty paths.
///
/// # Examples
///
/// ```
/// use dupewise::similarity::parse_pair_list;
///
/// let pairs = parse_pair_list("# reports\na.docx\tb.docx\n\n").unwrap();
/// assert_eq!(pairs.len(), 1);
/// assert!(parse_pair_list("only-one-path\n").is_err());
/// ```
pub fn parse_pair_list(text: &str) -> Result<Vec<DocumentPair>, PairListError> {
    let mut pairs = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim_end_matches('\r');
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split('\t');
        match (fields.next(), fields.next(), fields.next()) {
            (Some(left), Some(right), None) if !left.is_empty() && !right.is_empty() => {
                pairs.push(DocumentPair::new(left, right));
            }
            _ => {
                return Err(PairListError {
                    line: idx + 1,
                    text: line.to_string(),
                })
            }
        }
    }
    Ok(pairs)
}
