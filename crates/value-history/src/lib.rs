//! Patch-based undo/redo history for serializable values.
//!
//! [`VersionedValueHistory`] keeps an immutable baseline plus an ordered log
//! of [`PatchSet`]s and a cursor into that log. The current value is never
//! stored: it is rebuilt by replaying forward patches from the baseline up to
//! the cursor. Each recorded transition is verified in both directions when
//! it is added and degrades to a whole-value replacement if the diff cannot be
//! trusted.
//!
//! ```
//! use value_history::VersionedValueHistory;
//! use serde_json::json;
//!
//! let mut history = VersionedValueHistory::new(&json!({"a": 1})).unwrap();
//! history.add(&json!({"a": 2})).unwrap();
//! assert_eq!(history.undo().unwrap(), json!({"a": 1}));
//! assert_eq!(history.redo().unwrap(), json!({"a": 2}));
//! assert_eq!((history.position(), history.size()), (1, 2));
//! ```
//!
//! [`HistoryMap`] tracks one history per entity and a journal of change-sets
//! that can be undone and redone across entities.

pub mod cli;
pub mod error;
pub mod history;
pub mod options;
pub mod registry;
pub mod snapshot;

pub use error::{HistoryError, SnapshotError};
pub use history::VersionedValueHistory;
pub use options::HistoryOptions;
pub use registry::{Change, ChangeId, HistoryMap, JournalChange, JournalEntry};
pub use snapshot::HistorySnapshot;

pub use value_history_patch::{DiffFallback, DiffStrategy, FallbackSink, FallbackStage, Op, PatchSet, TracingSink};
