//! Structural patches over `serde_json::Value` trees.
//!
//! A patch is an ordered list of [`Op`]s (`add`, `remove`, `replace`), each
//! addressing a node by [`Path`]. A [`PatchSet`] pairs the forward patch for
//! one version transition with the inverse patch that undoes it.
//!
//! [`determine_changes`] is the entry point used by the history log: it
//! diffs two values, replays the result in both directions and falls back to
//! a whole-value replacement when either replay disagrees.

pub mod apply;
pub mod changes;
pub mod codec;
pub mod diff;
pub mod equal;
pub mod merge;
pub mod types;

pub use apply::{apply_op, apply_ops};
pub use changes::{determine_changes, DiffFallback, DiffStrategy, FallbackSink, FallbackStage, TracingSink};
pub use codec::{from_json, from_json_patch, to_json, to_json_patch};
pub use diff::{diff, structural_diff};
pub use equal::deep_equal;
pub use merge::{merge_diff, MergeOutcome};
pub use types::{Op, PatchError, PatchSet, Path};
