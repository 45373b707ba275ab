//! File actions module.
//!
//! This module provides:
//! - Deletion planning: one keeper per exact group, similar groups untouched
//! - Permanent removal with per-file failure collection
//!
//! ```no_run
//! use dupewise::actions::DeletionPlanner;
//! use dupewise::duplicates::GroupModel;
//!
//! # let model = GroupModel::empty();
//! let plan = DeletionPlanner::plan(&model);
//! let report = DeletionPlanner::execute(&plan);
//! println!("{}", report.summary());
//! ```

pub mod delete;
pub mod planner;

pub use delete::{
    delete_batch, permanent_delete, validate_preserves_copy, DeleteError,
    DeleteProgressCallback, DeleteResult, DeletionReport,
};
pub use planner::{DeletionPlan, DeletionPlanner, PlannedGroup};
