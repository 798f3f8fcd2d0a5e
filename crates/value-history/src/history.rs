//! The versioned value history.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use value_history_patch::{apply_ops, determine_changes, FallbackSink, PatchSet, TracingSink};

use crate::error::HistoryError;
use crate::options::HistoryOptions;

/// Undo/redo history of a single value.
///
/// Values are projected into `serde_json::Value` trees. An absent value is
/// `None` at the root (serialized as `null`) and an absent field is a missing
/// key (`#[serde(skip_serializing_if = "Option::is_none")]`).
///
/// Index 0 of the log is always the empty patch set, so `size() >= 1` and
/// `position() <= size() - 1` for a live history. After [`clear`](Self::clear)
/// the history is terminal: `size()` is 0 and every value-producing call
/// returns [`HistoryError::Cleared`].
///
/// There is no internal locking; share an instance across threads behind a
/// single `Mutex`.
pub struct VersionedValueHistory<T> {
    baseline: Value,
    log: Vec<PatchSet>,
    position: usize,
    cleared: bool,
    options: HistoryOptions,
    sink: Arc<dyn FallbackSink>,
    _value: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for VersionedValueHistory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionedValueHistory")
            .field("position", &self.position)
            .field("size", &self.log.len())
            .field("cleared", &self.cleared)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<T> VersionedValueHistory<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Starts a history at `initial` with default options, reporting diff
    /// fallbacks through `tracing`.
    pub fn new(initial: &T) -> Result<Self, HistoryError> {
        Self::with_options(initial, HistoryOptions::default(), Arc::new(TracingSink))
    }

    pub fn with_options(
        initial: &T,
        options: HistoryOptions,
        sink: Arc<dyn FallbackSink>,
    ) -> Result<Self, HistoryError> {
        let baseline = serde_json::to_value(initial).map_err(HistoryError::Serialize)?;
        Ok(Self::from_document(baseline, options, sink))
    }

    /// Starts a history at an already projected document.
    pub(crate) fn from_document(baseline: Value, options: HistoryOptions, sink: Arc<dyn FallbackSink>) -> Self {
        Self::from_parts(baseline, vec![PatchSet::empty()], 0, options, sink)
    }

    pub(crate) fn from_parts(
        baseline: Value,
        log: Vec<PatchSet>,
        position: usize,
        options: HistoryOptions,
        sink: Arc<dyn FallbackSink>,
    ) -> Self {
        Self {
            baseline,
            log,
            position,
            cleared: false,
            options,
            sink,
            _value: PhantomData,
        }
    }

    /// Index of the current version.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Number of versions in the log, including the baseline entry.
    pub fn size(&self) -> usize {
        self.log.len()
    }

    pub fn is_cleared(&self) -> bool {
        self.cleared
    }

    pub fn can_undo(&self) -> bool {
        !self.cleared && self.position > 0
    }

    pub fn can_redo(&self) -> bool {
        !self.cleared && self.position + 1 < self.log.len()
    }

    pub fn options(&self) -> &HistoryOptions {
        &self.options
    }

    /// The value the history was started with.
    pub fn baseline(&self) -> &Value {
        &self.baseline
    }

    /// The patch set that leads from version `index - 1` to version `index`.
    pub fn patch_set(&self, index: usize) -> Option<&PatchSet> {
        self.log.get(index)
    }

    pub(crate) fn log(&self) -> &[PatchSet] {
        &self.log
    }

    /// The current version as a document tree.
    pub fn document(&self) -> Result<Value, HistoryError> {
        self.ensure_live()?;
        materialize(&self.baseline, &self.log[..=self.position])
    }

    /// The current version.
    pub fn value(&self) -> Result<T, HistoryError> {
        serde_json::from_value(self.document()?).map_err(HistoryError::Deserialize)
    }

    /// Records `value` as the next version.
    ///
    /// Versions after the cursor are discarded first. Afterwards the cursor
    /// sits on the new version and [`value`](Self::value) equals `value`.
    pub fn add(&mut self, value: &T) -> Result<(), HistoryError> {
        self.ensure_live()?;
        let updated = serde_json::to_value(value).map_err(HistoryError::Serialize)?;
        self.add_document(updated)
    }

    /// Records an already projected document as the next version.
    pub(crate) fn add_document(&mut self, updated: Value) -> Result<(), HistoryError> {
        let current = self.document()?;

        let discarded = self.log.len() - (self.position + 1);
        self.log.truncate(self.position + 1);

        let changes = determine_changes(&current, &updated, self.options.strategy, self.sink.as_ref());
        debug!(
            position = self.position + 1,
            forward_ops = changes.forward.len(),
            discarded,
            "recorded version"
        );
        self.log.push(changes);
        self.set_position(self.position + 1);
        Ok(())
    }

    /// Moves the cursor back one version (no-op at the baseline) and returns
    /// the value there.
    pub fn undo(&mut self) -> Result<T, HistoryError> {
        self.ensure_live()?;
        self.set_position(self.position.saturating_sub(1));
        debug!(position = self.position, "undo");
        self.value()
    }

    /// Moves the cursor forward one version (no-op at the newest version) and
    /// returns the value there.
    pub fn redo(&mut self) -> Result<T, HistoryError> {
        self.ensure_live()?;
        self.set_position(self.position + 1);
        debug!(position = self.position, "redo");
        self.value()
    }

    /// Drops the whole log. The history cannot be used afterwards.
    pub fn clear(&mut self) {
        self.log.clear();
        self.position = 0;
        self.cleared = true;
        debug!("history cleared");
    }

    fn ensure_live(&self) -> Result<(), HistoryError> {
        if self.cleared {
            Err(HistoryError::Cleared)
        } else {
            Ok(())
        }
    }

    fn set_position(&mut self, index: usize) {
        self.position = index.min(self.log.len().saturating_sub(1));
    }
}

/// Replays each entry's forward patch onto the baseline.
pub(crate) fn materialize(baseline: &Value, log: &[PatchSet]) -> Result<Value, HistoryError> {
    log.iter().enumerate().try_fold(baseline.clone(), |doc, (index, set)| {
        apply_ops(doc, &set.forward).map_err(|source| HistoryError::Replay { index, source })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use value_history_patch::{DiffStrategy, Op};

    fn history(initial: Value) -> VersionedValueHistory<Value> {
        VersionedValueHistory::new(&initial).unwrap()
    }

    #[test]
    fn starts_at_baseline() {
        let h = history(json!({"a": 1}));
        assert_eq!(h.position(), 0);
        assert_eq!(h.size(), 1);
        assert!(h.patch_set(0).unwrap().is_empty());
        assert!(!h.can_undo());
        assert!(!h.can_redo());
        assert_eq!(h.value().unwrap(), json!({"a": 1}));
    }

    #[test]
    fn add_stores_small_patch() {
        let mut h = history(json!({"a": 1, "payload": [1, 2, 3, 4]}));
        h.add(&json!({"a": 2, "payload": [1, 2, 3, 4]})).unwrap();
        let set = h.patch_set(1).unwrap();
        assert_eq!(set.forward, vec![Op::Replace { path: vec!["a".into()], value: json!(2) }]);
        assert_eq!(set.inverse, vec![Op::Replace { path: vec!["a".into()], value: json!(1) }]);
    }

    #[test]
    fn undo_and_redo_clamp() {
        let mut h = history(json!(1));
        assert_eq!(h.undo().unwrap(), json!(1));
        assert_eq!(h.position(), 0);
        h.add(&json!(2)).unwrap();
        assert_eq!(h.redo().unwrap(), json!(2));
        assert_eq!(h.redo().unwrap(), json!(2));
        assert_eq!(h.position(), 1);
        assert!(h.can_undo());
        assert!(!h.can_redo());
    }

    #[test]
    fn add_after_undo_discards_redo_branch() {
        let mut h = history(json!({"a": 1}));
        h.add(&json!({"a": 2})).unwrap();
        h.add(&json!({"a": 3})).unwrap();
        h.undo().unwrap();
        h.add(&json!({"a": 4})).unwrap();
        assert_eq!((h.position(), h.size()), (2, 3));
        assert_eq!(h.value().unwrap(), json!({"a": 4}));
        h.undo().unwrap();
        assert_eq!(h.value().unwrap(), json!({"a": 2}));
    }

    #[test]
    fn value_does_not_mutate_state() {
        let mut h = history(json!({"a": [1]}));
        h.add(&json!({"a": [1, 2]})).unwrap();
        let first = h.value().unwrap();
        let second = h.value().unwrap();
        assert_eq!(first, second);
        assert_eq!(h.baseline(), &json!({"a": [1]}));
        assert_eq!(h.size(), 2);
    }

    #[test]
    fn clear_is_terminal() {
        let mut h = history(json!({"a": 1}));
        h.add(&json!({"a": 2})).unwrap();
        h.clear();
        assert!(h.is_cleared());
        assert_eq!((h.position(), h.size()), (0, 0));
        assert!(!h.can_undo());
        assert!(!h.can_redo());
        assert!(matches!(h.value(), Err(HistoryError::Cleared)));
        assert!(matches!(h.undo(), Err(HistoryError::Cleared)));
        assert!(matches!(h.redo(), Err(HistoryError::Cleared)));
        assert!(matches!(h.add(&json!({"a": 3})), Err(HistoryError::Cleared)));
    }

    #[test]
    fn structural_strategy_avoids_root_replace() {
        let options = HistoryOptions::default().with_strategy(DiffStrategy::Structural);
        let mut h = VersionedValueHistory::with_options(&json!({"a": 1, "b": "x"}), options, Arc::new(TracingSink)).unwrap();
        h.add(&json!({"a": 1})).unwrap();
        assert_eq!(h.patch_set(1).unwrap().forward, vec![Op::Remove { path: vec!["b".into()] }]);
        assert_eq!(h.value().unwrap(), json!({"a": 1}));
    }

    #[test]
    fn corrupted_log_reports_replay_index() {
        let mut h = history(json!({"a": 1}));
        h.log.push(PatchSet {
            forward: vec![Op::Remove { path: vec!["missing".into()] }],
            inverse: vec![],
        });
        h.position = 1;
        assert!(matches!(h.value(), Err(HistoryError::Replay { index: 1, .. })));
    }

    #[test]
    fn debug_shows_cursor() {
        let h = history(json!(null));
        let dbg = format!("{h:?}");
        assert!(dbg.contains("position: 0"));
        assert!(dbg.contains("size: 1"));
    }
}
