//! Snapshot persistence and merging
//!
//! The snapshot document is the single source of truth for a run and the
//! only thing resume looks at. [`SnapshotStore`] owns the on-disk copy and
//! [`SnapshotMerger`] is the single writer that folds finished records into
//! it, flushing after every merge.

mod merger;
mod store;

pub use merger::{MergerHandle, SnapshotMerger};
pub use store::{ResumeError, SnapshotStore};
