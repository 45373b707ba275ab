//! Deletion planning over a [`GroupModel`].
//!
//! The plan keeps the first reported member of every exact group and lists
//! the rest. Similar groups never contribute. The one-keeper-per-exact-group
//! guarantee lives here and only here: [`DeletionPlanner::execute`] removes
//! whatever the plan lists without re-checking it.
//!
//! # Example
//!
//! ```
//! use dupewise::actions::DeletionPlanner;
//! use dupewise::duplicates::GroupModel;
//! use dupewise::protocol::parse_groups;
//! use std::path::PathBuf;
//!
//! let model = GroupModel::new(parse_groups(
//!     "EXACT|1.0\n/a\n/b\n---GROUP---\nSIMILAR|0.8\n/c|0.9\n/d|0.7\n---GROUP---\n",
//! ));
//! let plan = DeletionPlanner::plan(&model);
//! assert_eq!(plan.candidates(), vec![PathBuf::from("/b")]);
//! ```

use std::path::PathBuf;

use crate::actions::delete::{
    delete_batch, validate_preserves_copy, DeleteProgressCallback, DeletionReport,
};
use crate::duplicates::{GroupKind, GroupModel};

/// Files to remove from one exact group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedGroup {
    /// Retained file (first reported member)
    pub keeper: PathBuf,
    /// Files to remove, in backend order
    pub candidates: Vec<PathBuf>,
}

/// Ordered set of files that may be removed without losing content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionPlan {
    groups: Vec<PlannedGroup>,
}

impl DeletionPlan {
    /// Per-group breakdown, in model order.
    #[must_use]
    pub fn groups(&self) -> &[PlannedGroup] {
        &self.groups
    }

    /// Every candidate path, flattened in model order.
    #[must_use]
    pub fn candidates(&self) -> Vec<PathBuf> {
        self.groups
            .iter()
            .flat_map(|g| g.candidates.iter().cloned())
            .collect()
    }

    /// Number of candidate files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.candidates.len()).sum()
    }

    /// Check if nothing would be deleted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Computes and executes deletion plans.
pub struct DeletionPlanner;

impl DeletionPlanner {
    /// List every member but the first of each exact group with 2+ members.
    ///
    /// Pure and deterministic: the same model always yields the same plan.
    #[must_use]
    pub fn plan(model: &GroupModel) -> DeletionPlan {
        let mut groups = Vec::new();

        for group in model.reportable_groups() {
            if group.kind != GroupKind::Exact {
                continue;
            }
            let Some(keeper) = group.keeper() else {
                continue;
            };

            let candidates: Vec<PathBuf> = group
                .redundant_members()
                .iter()
                .map(|m| m.path.clone())
                .collect();

            if let Err(e) = validate_preserves_copy(&candidates, &group.paths()) {
                log::error!("Skipping group kept by {}: {}", keeper.path.display(), e);
                continue;
            }

            groups.push(PlannedGroup {
                keeper: keeper.path.clone(),
                candidates,
            });
        }

        let plan = DeletionPlan { groups };
        log::debug!(
            "Deletion plan: {} file(s) across {} exact group(s)",
            plan.len(),
            plan.groups.len()
        );
        plan
    }

    /// Remove every planned file; failures are reported, never raised.
    #[must_use]
    pub fn execute(plan: &DeletionPlan) -> DeletionReport {
        Self::execute_with_progress::<dyn DeleteProgressCallback>(plan, None)
    }

    /// [`execute`](Self::execute) with a progress observer.
    pub fn execute_with_progress<C: DeleteProgressCallback + ?Sized>(
        plan: &DeletionPlan,
        callback: Option<&C>,
    ) -> DeletionReport {
        if plan.is_empty() {
            log::info!("Nothing to delete");
            return DeletionReport::default();
        }
        delete_batch(&plan.candidates(), callback)
    }
}
