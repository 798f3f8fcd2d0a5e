//! Verified change computation.
//!
//! [`determine_changes`] diffs two values with the configured
//! [`DiffStrategy`], then checks the result three ways: the merged draft must
//! equal the update, the forward patch must turn the original into the
//! update, and the inverse patch must turn the update back into the
//! original. The first failed check is reported to a [`FallbackSink`] and the
//! transition is recorded as a whole-value replacement instead.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::apply::apply_ops;
use crate::diff::structural_diff;
use crate::equal::deep_equal;
use crate::merge::merge_diff;
use crate::types::{Op, PatchSet};

/// How candidate patches are computed before verification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffStrategy {
    /// Deep-merge the update onto a recording draft of the original.
    #[default]
    Merge,
    /// Recursive differ that can also express removals.
    Structural,
}

/// Which verification step rejected the candidate patches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackStage {
    /// The merged draft differs from the update.
    Result,
    /// Replaying the forward patch on the original does not yield the update.
    Forward,
    /// Replaying the inverse patch on the update does not yield the original.
    Inverse,
}

impl fmt::Display for FallbackStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FallbackStage::Result => "result",
            FallbackStage::Forward => "forward",
            FallbackStage::Inverse => "inverse",
        })
    }
}

/// A rejected diff that was replaced by a whole-value patch.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffFallback {
    pub stage: FallbackStage,
    pub strategy: DiffStrategy,
    /// Number of forward ops in the rejected candidate.
    pub rejected_ops: usize,
}

/// Receives a notification for every diff fallback.
pub trait FallbackSink: Send + Sync {
    fn on_fallback(&self, fallback: &DiffFallback);
}

/// Default sink: emits a `tracing` warning.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl FallbackSink for TracingSink {
    fn on_fallback(&self, fallback: &DiffFallback) {
        tracing::warn!(
            stage = %fallback.stage,
            strategy = ?fallback.strategy,
            rejected_ops = fallback.rejected_ops,
            "diff did not reproduce the value, recording a whole-value replacement"
        );
    }
}

fn replays_to(start: &Value, ops: &[Op], expected: &Value) -> bool {
    apply_ops(start.clone(), ops).is_ok_and(|doc| deep_equal(&doc, expected))
}

/// Computes the patches between `original` and `updated`.
///
/// The returned set always satisfies both replay checks; when the chosen
/// strategy cannot produce such a set it is [`PatchSet::replace_root`].
pub fn determine_changes(
    original: &Value,
    updated: &Value,
    strategy: DiffStrategy,
    sink: &dyn FallbackSink,
) -> PatchSet {
    let (draft, changes) = match strategy {
        DiffStrategy::Merge => {
            let outcome = merge_diff(original, updated);
            (Some(outcome.result), outcome.changes)
        }
        DiffStrategy::Structural => (None, structural_diff(original, updated)),
    };

    let failed = if draft.is_some_and(|d| !deep_equal(&d, updated)) {
        Some(FallbackStage::Result)
    } else if !replays_to(original, &changes.forward, updated) {
        Some(FallbackStage::Forward)
    } else if !replays_to(updated, &changes.inverse, original) {
        Some(FallbackStage::Inverse)
    } else {
        None
    };

    match failed {
        None => changes,
        Some(stage) => {
            sink.on_fallback(&DiffFallback {
                stage,
                strategy,
                rejected_ops: changes.forward.len(),
            });
            PatchSet::replace_root(original, updated)
        }
    }
}
