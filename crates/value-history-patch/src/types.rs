//! Core patch types.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use value_history_pointer::Path;

// ── Error ─────────────────────────────────────────────────────────────────

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PatchError {
    #[error("NOT_FOUND")]
    NotFound,
    #[error("INVALID_INDEX")]
    InvalidIndex,
    #[error("INVALID_TARGET")]
    InvalidTarget,
    #[error("INVALID_OP: {0}")]
    InvalidOp(String),
}

// ── Op ────────────────────────────────────────────────────────────────────

/// A single structural operation against a value tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Add { path: Path, value: Value },
    Remove { path: Path },
    Replace { path: Path, value: Value },
}

impl Op {
    pub fn op_name(&self) -> &'static str {
        match self {
            Op::Add { .. } => "add",
            Op::Remove { .. } => "remove",
            Op::Replace { .. } => "replace",
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Op::Add { path, .. } | Op::Remove { path } | Op::Replace { path, .. } => path,
        }
    }

    /// The value written by the operation; `None` for `remove`.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Op::Add { value, .. } | Op::Replace { value, .. } => Some(value),
            Op::Remove { .. } => None,
        }
    }
}

// ── PatchSet ──────────────────────────────────────────────────────────────

/// The forward and inverse patches for one version transition.
///
/// Replaying `forward` against version *i-1* yields version *i*; replaying
/// `inverse` against version *i* yields version *i-1*.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatchSet {
    pub forward: Vec<Op>,
    pub inverse: Vec<Op>,
}

impl PatchSet {
    /// The "no change" patch set.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty() && self.inverse.is_empty()
    }

    /// Swaps the whole value in both directions.
    pub fn replace_root(original: &Value, updated: &Value) -> Self {
        Self {
            forward: vec![Op::Replace { path: Path::new(), value: updated.clone() }],
            inverse: vec![Op::Replace { path: Path::new(), value: original.clone() }],
        }
    }
}
