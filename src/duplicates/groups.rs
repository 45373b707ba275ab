//! Duplicate groups reported by the scanner backend and the model over them.
//!
//! # Overview
//!
//! A [`DuplicateGroup`] is either [`GroupKind::Exact`] (members are
//! interchangeable, all but one may be removed) or [`GroupKind::Similar`]
//! (members are related but never deleted automatically).
//!
//! [`GroupModel`] wraps the parsed sequence in backend order and answers the
//! aggregate questions the presentation layer asks. Groups with a single
//! member are kept for diagnostics but are excluded from every count.
//!
//! # Example
//!
//! ```
//! use dupewise::duplicates::{DuplicateGroup, FileRecord, GroupKind, GroupModel};
//!
//! let model = GroupModel::new(vec![
//!     DuplicateGroup::new(
//!         GroupKind::Exact,
//!         1.0,
//!         vec![FileRecord::new("/a", 1.0), FileRecord::new("/b", 1.0)],
//!     ),
//!     DuplicateGroup::new(GroupKind::Similar, 0.8, vec![FileRecord::new("/c", 0.9)]),
//! ]);
//!
//! assert_eq!(model.exact_group_count(), 1);
//! assert_eq!(model.similar_group_count(), 0); // singleton, not counted
//! assert!(!model.no_duplicates_found());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::PathBuf;

/// Classification of a group as emitted by the backend header line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKind {
    /// Byte-identical (or equivalent) files.
    Exact,
    /// Content-related files that are not interchangeable.
    Similar,
}

impl GroupKind {
    /// Protocol token for this kind (`EXACT` / `SIMILAR`).
    #[must_use]
    pub fn token(self) -> &'static str {
        match self {
            Self::Exact => "EXACT",
            Self::Similar => "SIMILAR",
        }
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::Similar => write!(f, "similar"),
        }
    }
}

/// One file reported by the backend.
///
/// The path is the record's identity. Size is not carried: it is read from
/// the file system on demand since the file may change or vanish after the
/// scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Path as reported by the backend
    pub path: PathBuf,
    /// Per-file similarity in [0, 1], used for display only
    pub similarity: f64,
}

impl FileRecord {
    /// Create a new file record.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, similarity: f64) -> Self {
        Self {
            path: path.into(),
            similarity,
        }
    }

    /// Current size of the file, or `None` if it no longer exists or cannot
    /// be read.
    #[must_use]
    pub fn size_bytes(&self) -> Option<u64> {
        fs::metadata(&self.path)
            .ok()
            .filter(fs::Metadata::is_file)
            .map(|m| m.len())
    }
}

/// A group of related files in backend order.
///
/// The first member is the keeper of an exact group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// Exact or similar
    pub kind: GroupKind,
    /// Group-level similarity from the header line (1.0 for exact groups)
    pub declared_similarity: f64,
    /// Members in the order the backend reported them
    pub members: Vec<FileRecord>,
}

impl DuplicateGroup {
    /// Create a new group.
    #[must_use]
    pub fn new(kind: GroupKind, declared_similarity: f64, members: Vec<FileRecord>) -> Self {
        Self {
            kind,
            declared_similarity,
            members,
        }
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if this group has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Check if this is an exact group.
    #[must_use]
    pub fn is_exact(&self) -> bool {
        self.kind == GroupKind::Exact
    }

    /// A group with fewer than two members reports nothing.
    #[must_use]
    pub fn is_reportable(&self) -> bool {
        self.members.len() > 1
    }

    /// The file that survives deduplication: the first reported member.
    #[must_use]
    pub fn keeper(&self) -> Option<&FileRecord> {
        self.members.first()
    }

    /// Members after the keeper.
    #[must_use]
    pub fn redundant_members(&self) -> &[FileRecord] {
        self.members.get(1..).unwrap_or_default()
    }

    /// Arithmetic mean of member similarities, falling back to the declared
    /// similarity when there are no members.
    #[must_use]
    pub fn average_similarity(&self) -> f64 {
        if self.members.is_empty() {
            return self.declared_similarity;
        }
        let total: f64 = self.members.iter().map(|m| m.similarity).sum();
        total / self.members.len() as f64
    }

    /// Just the member paths.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.members.iter().map(|m| m.path.clone()).collect()
    }

    /// Bytes freed by removing every member but the keeper, using sizes as
    /// they are on disk right now. Zero for similar groups.
    #[must_use]
    pub fn reclaimable_bytes(&self) -> u64 {
        if !self.is_exact() {
            return 0;
        }
        self.redundant_members()
            .iter()
            .filter_map(FileRecord::size_bytes)
            .sum()
    }
}

/// Aggregate figures for a [`GroupModel`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ModelSummary {
    /// Exact groups with 2+ members
    pub exact_groups: usize,
    /// Similar groups with 2+ members
    pub similar_groups: usize,
    /// Non-keeper members of reportable exact groups
    pub exact_duplicate_files: usize,
    /// Members of reportable similar groups
    pub similar_files: usize,
    /// Groups retained only for diagnostics
    pub singleton_groups: usize,
    /// Bytes that deleting the exact duplicates would free
    pub reclaimable_bytes: u64,
}

/// The parsed group sequence of one scan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupModel {
    groups: Vec<DuplicateGroup>,
}

impl GroupModel {
    /// Wrap a parsed group sequence, preserving its order.
    #[must_use]
    pub fn new(groups: Vec<DuplicateGroup>) -> Self {
        Self { groups }
    }

    /// Model with no groups.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Every group, singletons included.
    #[must_use]
    pub fn raw_groups(&self) -> &[DuplicateGroup] {
        &self.groups
    }

    /// Groups with at least two members, in backend order.
    pub fn reportable_groups(&self) -> impl Iterator<Item = &DuplicateGroup> {
        self.groups.iter().filter(|g| g.is_reportable())
    }

    /// Number of reportable exact groups.
    #[must_use]
    pub fn exact_group_count(&self) -> usize {
        self.count_kind(GroupKind::Exact)
    }

    /// Number of reportable similar groups.
    #[must_use]
    pub fn similar_group_count(&self) -> usize {
        self.count_kind(GroupKind::Similar)
    }

    fn count_kind(&self, kind: GroupKind) -> usize {
        self.reportable_groups().filter(|g| g.kind == kind).count()
    }

    /// True iff the model is empty or every group has at most one member.
    #[must_use]
    pub fn no_duplicates_found(&self) -> bool {
        self.groups.iter().all(|g| !g.is_reportable())
    }

    /// Compute the aggregate summary. Touches the file system for sizes.
    #[must_use]
    pub fn summary(&self) -> ModelSummary {
        let mut summary = ModelSummary::default();

        for group in &self.groups {
            if !group.is_reportable() {
                summary.singleton_groups += 1;
                continue;
            }
            match group.kind {
                GroupKind::Exact => {
                    summary.exact_groups += 1;
                    summary.exact_duplicate_files += group.redundant_members().len();
                    summary.reclaimable_bytes += group.reclaimable_bytes();
                }
                GroupKind::Similar => {
                    summary.similar_groups += 1;
                    summary.similar_files += group.len();
                }
            }
        }

        log::debug!(
            "Model summary: {} exact group(s), {} similar group(s), {} singleton(s)",
            summary.exact_groups,
            summary.similar_groups,
            summary.singleton_groups
        );

        summary
    }
}

impl From<Vec<DuplicateGroup>> for GroupModel {
    fn from(groups: Vec<DuplicateGroup>) -> Self {
        Self::new(groups)
    }
}
