//! Persistence of a history as baseline, patch log and cursor.
//!
//! The serialized form is
//!
//! ```json
//! {
//!   "baseline": <value>,
//!   "position": 1,
//!   "log": [
//!     {"forward": [], "inverse": []},
//!     {"forward": [{"op": "replace", "path": "/a", "value": 2}],
//!      "inverse": [{"op": "replace", "path": "/a", "value": 1}]}
//!   ]
//! }
//! ```

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use value_history_patch::{apply_ops, FallbackSink, PatchSet};

use crate::error::{HistoryError, SnapshotError};
use crate::history::VersionedValueHistory;
use crate::options::HistoryOptions;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    pub baseline: Value,
    pub position: usize,
    pub log: Vec<PatchSet>,
}

impl HistorySnapshot {
    /// Checks the structural invariants and that every entry replays.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        let first = self.log.first().ok_or(SnapshotError::EmptyLog)?;
        if !first.is_empty() {
            return Err(SnapshotError::BaselineEntryNotEmpty);
        }
        if self.position >= self.log.len() {
            return Err(SnapshotError::PositionOutOfRange {
                position: self.position,
                size: self.log.len(),
            });
        }
        let mut doc = self.baseline.clone();
        for (index, set) in self.log.iter().enumerate().skip(1) {
            doc = apply_ops(doc, &set.forward).map_err(|source| SnapshotError::Replay { index, source })?;
        }
        Ok(())
    }
}

impl<T> VersionedValueHistory<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn snapshot(&self) -> Result<HistorySnapshot, HistoryError> {
        if self.is_cleared() {
            return Err(HistoryError::Cleared);
        }
        Ok(HistorySnapshot {
            baseline: self.baseline().clone(),
            position: self.position(),
            log: self.log().to_vec(),
        })
    }

    /// Restores a history from a validated snapshot.
    pub fn from_snapshot(
        snapshot: HistorySnapshot,
        options: HistoryOptions,
        sink: Arc<dyn FallbackSink>,
    ) -> Result<Self, SnapshotError> {
        snapshot.validate()?;
        let HistorySnapshot { baseline, position, log } = snapshot;
        Ok(Self::from_parts(baseline, log, position, options, sink))
    }
}
