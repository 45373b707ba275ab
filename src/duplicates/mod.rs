//! Duplicate group model.
//!
//! This module provides:
//! - File records and exact/similar groups as reported by the backend
//! - The group model answering aggregate queries for display and planning

pub mod groups;

pub use groups::{DuplicateGroup, FileRecord, GroupKind, GroupModel, ModelSummary};
