//! Histories for many entities plus a journal of cross-entity change-sets.
//!
//! Each [`HistoryMap::record`] call appends one journal entry naming every
//! entity it touched. Undo walks the journal backwards and steps each touched
//! entity's history back once; redo replays entries in the reverse of the
//! order they were undone.
//!
//! Changes may carry a group (for example the open event they were made
//! under). The `*_group` operations only step the changes of one group, so
//! one group can be undone while another keeps its edits.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use value_history_patch::{FallbackSink, TracingSink};

use crate::error::HistoryError;
use crate::history::VersionedValueHistory;
use crate::options::HistoryOptions;

pub type ChangeId = u64;

/// One entity edit inside a change-set.
#[derive(Debug, Clone, PartialEq)]
pub struct Change<K, G, T> {
    pub key: K,
    /// `None` marks an edit outside any group.
    pub group: Option<G>,
    /// The value before the edit; becomes the baseline of a new history.
    pub previous: T,
    pub current: T,
}

impl<K, G, T> Change<K, G, T> {
    pub fn new(key: K, previous: T, current: T) -> Self {
        Self { key, group: None, previous, current }
    }

    pub fn in_group(mut self, group: G) -> Self {
        self.group = Some(group);
        self
    }
}

/// An entity edit as remembered by the journal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalChange<K, G> {
    pub key: K,
    pub group: Option<G>,
    /// False while the edit is undone.
    pub active: bool,
}

/// A recorded change-set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry<K, G> {
    pub id: ChangeId,
    pub changes: Vec<JournalChange<K, G>>,
}

impl<K, G: PartialEq> JournalEntry<K, G> {
    /// True while at least one change of the entry is applied.
    pub fn is_active(&self) -> bool {
        self.changes.iter().any(|change| change.active)
    }

    /// True when no change of the entry is undone.
    pub fn is_fully_active(&self) -> bool {
        self.changes.iter().all(|change| change.active)
    }

    /// Active state of the entry's first change in `group`.
    fn group_active(&self, group: &G) -> Option<bool> {
        self.changes
            .iter()
            .find(|change| change.group.as_ref() == Some(group))
            .map(|change| change.active)
    }
}

pub struct HistoryMap<K, G, T> {
    items: HashMap<K, VersionedValueHistory<T>>,
    journal: Vec<JournalEntry<K, G>>,
    redo_order: Vec<ChangeId>,
    next_id: ChangeId,
    options: HistoryOptions,
    sink: Arc<dyn FallbackSink>,
}

impl<K: fmt::Debug, G: fmt::Debug, T> fmt::Debug for HistoryMap<K, G, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryMap")
            .field("entities", &self.items.len())
            .field("journal", &self.journal)
            .field("redo_order", &self.redo_order)
            .finish_non_exhaustive()
    }
}

impl<K, G, T> Default for HistoryMap<K, G, T>
where
    K: Eq + Hash + Clone,
    G: Eq + Clone,
    T: Serialize + DeserializeOwned,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, G, T> HistoryMap<K, G, T>
where
    K: Eq + Hash + Clone,
    G: Eq + Clone,
    T: Serialize + DeserializeOwned,
{
    pub fn new() -> Self {
        Self::with_options(HistoryOptions::default(), Arc::new(TracingSink))
    }

    pub fn with_options(options: HistoryOptions, sink: Arc<dyn FallbackSink>) -> Self {
        Self {
            items: HashMap::new(),
            journal: Vec::new(),
            redo_order: Vec::new(),
            next_id: 1,
            options,
            sink,
        }
    }

    /// Records one change-set. Returns `None` when `changes` is empty.
    ///
    /// Every value is converted before any history moves, so a value that
    /// fails to serialize leaves the map untouched. Undone changes in the
    /// groups this change-set touches are discarded; when it spans several
    /// groups (or has ungrouped changes) every partly undone entry goes.
    pub fn record(&mut self, changes: Vec<Change<K, G, T>>) -> Result<Option<ChangeId>, HistoryError> {
        if changes.is_empty() {
            return Ok(None);
        }
        let staged = changes
            .into_iter()
            .map(|change| -> Result<_, HistoryError> {
                let previous = serde_json::to_value(&change.previous).map_err(HistoryError::Serialize)?;
                let current = serde_json::to_value(&change.current).map_err(HistoryError::Serialize)?;
                Ok((change.key, change.group, previous, current))
            })
            .collect::<Result<Vec<_>, HistoryError>>()?;

        let mut recorded = Vec::with_capacity(staged.len());
        for (key, group, previous, current) in staged {
            let history = match self.items.entry(key.clone()) {
                Entry::Occupied(slot) => slot.into_mut(),
                Entry::Vacant(slot) => slot.insert(VersionedValueHistory::from_document(
                    previous,
                    self.options.clone(),
                    Arc::clone(&self.sink),
                )),
            };
            history.add_document(current)?;
            recorded.push(JournalChange { key, group, active: true });
        }

        self.discard_undone(&recorded);
        let id = self.next_id;
        self.next_id += 1;
        debug!(id, entities = recorded.len(), "recorded change-set");
        self.journal.push(JournalEntry { id, changes: recorded });
        Ok(Some(id))
    }

    fn discard_undone(&mut self, recorded: &[JournalChange<K, G>]) {
        let mut groups: Vec<&Option<G>> = Vec::new();
        for change in recorded {
            if !groups.iter().any(|group| **group == change.group) {
                groups.push(&change.group);
            }
        }
        let global = groups.len() > 1 || groups.iter().any(|group| group.is_none());

        for entry in &mut self.journal {
            if global && !entry.is_fully_active() {
                entry.changes.clear();
            } else {
                entry
                    .changes
                    .retain(|change| change.active || !groups.iter().any(|group| **group == change.group));
            }
        }
        self.journal.retain(|entry| !entry.changes.is_empty());

        let journal = &self.journal;
        self.redo_order
            .retain(|id| journal.iter().any(|entry| entry.id == *id && !entry.is_fully_active()));
    }

    /// Undoes up to `count` of the most recent active change-sets and returns
    /// the new value of every entity touched, in the order they changed.
    pub fn undo(&mut self, count: usize) -> Result<Vec<(K, T)>, HistoryError> {
        let mut updated = Vec::new();
        for _ in 0..count {
            let Some(index) = self.journal.iter().rposition(JournalEntry::is_active) else {
                break;
            };
            self.step(index, None, true, &mut updated)?;
        }
        Ok(updated)
    }

    /// Redoes up to `count` change-sets, most recently undone first.
    pub fn redo(&mut self, count: usize) -> Result<Vec<(K, T)>, HistoryError> {
        let mut updated = Vec::new();
        for _ in 0..count {
            let Some(&id) = self.redo_order.last() else {
                break;
            };
            match self.index_of(id) {
                Some(index) => self.step(index, None, false, &mut updated)?,
                None => {
                    self.redo_order.pop();
                }
            }
        }
        Ok(updated)
    }

    /// Undoes every active change-set from the newest down to and including
    /// `id`.
    pub fn undo_through(&mut self, id: ChangeId) -> Result<Vec<(K, T)>, HistoryError> {
        let mut updated = Vec::new();
        if let Some(target) = self.index_of(id) {
            for index in (target..self.journal.len()).rev() {
                if self.journal[index].is_active() {
                    self.step(index, None, true, &mut updated)?;
                }
            }
        }
        Ok(updated)
    }

    /// Redoes every undone change-set from the oldest up to and including `id`.
    pub fn redo_through(&mut self, id: ChangeId) -> Result<Vec<(K, T)>, HistoryError> {
        let mut updated = Vec::new();
        if let Some(target) = self.index_of(id) {
            for index in 0..=target {
                if !self.journal[index].is_fully_active() {
                    self.step(index, None, false, &mut updated)?;
                }
            }
        }
        Ok(updated)
    }

    /// Undoes the changes of `group` in up to `count` of its most recent
    /// change-sets. Changes of other groups stay applied.
    pub fn undo_group(&mut self, group: &G, count: usize) -> Result<Vec<(K, T)>, HistoryError> {
        let mut updated = Vec::new();
        for _ in 0..count {
            let Some(index) = self.journal.iter().rposition(|entry| entry.group_active(group) == Some(true)) else {
                break;
            };
            self.step(index, Some(group), true, &mut updated)?;
        }
        Ok(updated)
    }

    /// Redoes the changes of `group` in up to `count` change-sets, oldest
    /// undone first.
    pub fn redo_group(&mut self, group: &G, count: usize) -> Result<Vec<(K, T)>, HistoryError> {
        let mut updated = Vec::new();
        for _ in 0..count {
            let Some(index) = self.journal.iter().position(|entry| entry.group_active(group) == Some(false)) else {
                break;
            };
            self.step(index, Some(group), false, &mut updated)?;
        }
        Ok(updated)
    }

    /// Undoes the changes of `group` from its newest change-set down to and
    /// including `id`.
    pub fn undo_group_through(&mut self, group: &G, id: ChangeId) -> Result<Vec<(K, T)>, HistoryError> {
        let mut updated = Vec::new();
        if let Some(target) = self.index_of(id) {
            for index in (target..self.journal.len()).rev() {
                if self.journal[index].group_active(group) == Some(true) {
                    self.step(index, Some(group), true, &mut updated)?;
                }
            }
        }
        Ok(updated)
    }

    /// Redoes the changes of `group` from its oldest change-set up to and
    /// including `id`.
    pub fn redo_group_through(&mut self, group: &G, id: ChangeId) -> Result<Vec<(K, T)>, HistoryError> {
        let mut updated = Vec::new();
        if let Some(target) = self.index_of(id) {
            for index in 0..=target {
                if self.journal[index].group_active(group) == Some(false) {
                    self.step(index, Some(group), false, &mut updated)?;
                }
            }
        }
        Ok(updated)
    }

    /// Undoes or redoes the changes of one journal entry, limited to `group`
    /// when given, and keeps the redo order in sync.
    fn step(
        &mut self,
        index: usize,
        group: Option<&G>,
        undo: bool,
        updated: &mut Vec<(K, T)>,
    ) -> Result<(), HistoryError> {
        let entry = &mut self.journal[index];
        let mut targets: Vec<usize> = entry
            .changes
            .iter()
            .enumerate()
            .filter(|(_, change)| change.active == undo && group.map_or(true, |g| change.group.as_ref() == Some(g)))
            .map(|(i, _)| i)
            .collect();
        if undo {
            targets.reverse();
        }

        for i in targets {
            let change = &mut entry.changes[i];
            if let Some(history) = self.items.get_mut(&change.key) {
                let value = if undo { history.undo()? } else { history.redo()? };
                updated.push((change.key.clone(), value));
            }
            change.active = !undo;
        }

        let id = entry.id;
        if undo || entry.is_fully_active() {
            self.redo_order.retain(|x| *x != id);
        }
        if undo {
            self.redo_order.push(id);
        }
        debug!(id, undo, grouped = group.is_some(), "stepped change-set");
        Ok(())
    }

    fn index_of(&self, id: ChangeId) -> Option<usize> {
        self.journal.iter().position(|entry| entry.id == id)
    }

    /// Where `id` sits in the redo order; 1 means it is redone next.
    pub fn redo_priority(&self, id: ChangeId) -> Option<usize> {
        self.redo_order.iter().rev().position(|x| *x == id).map(|p| p + 1)
    }

    pub fn get(&self, key: &K) -> Option<&VersionedValueHistory<T>> {
        self.items.get(key)
    }

    /// The current value of `key`, if it is tracked.
    pub fn value(&self, key: &K) -> Result<Option<T>, HistoryError> {
        self.items.get(key).map(VersionedValueHistory::value).transpose()
    }

    pub fn history(&self) -> &[JournalEntry<K, G>] {
        &self.journal
    }

    /// The journal entries that touch `group`, each narrowed to the changes
    /// made in that group.
    pub fn history_for(&self, group: &G) -> Vec<JournalEntry<K, G>> {
        self.journal
            .iter()
            .filter_map(|entry| {
                let changes: Vec<_> = entry
                    .changes
                    .iter()
                    .filter(|change| change.group.as_ref() == Some(group))
                    .cloned()
                    .collect();
                (!changes.is_empty()).then(|| JournalEntry { id: entry.id, changes })
            })
            .collect()
    }

    /// Number of tracked entities.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Forgets every entity and the journal.
    pub fn clear(&mut self) {
        self.items.clear();
        self.journal.clear();
        self.redo_order.clear();
        debug!("history map cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::ser::Error as _;
    use serde::{Deserialize, Serializer};
    use serde_json::{json, Value};

    type Map = HistoryMap<String, String, Value>;

    fn change(key: &str, previous: Value, current: Value) -> Change<String, String, Value> {
        Change::new(key.to_string(), previous, current)
    }

    fn grouped(group: &str, key: &str, previous: Value, current: Value) -> Change<String, String, Value> {
        change(key, previous, current).in_group(group.to_string())
    }

    fn value(map: &Map, key: &str) -> Option<Value> {
        map.value(&key.to_string()).unwrap()
    }

    #[test]
    fn empty_record_is_ignored() {
        let mut map = Map::new();
        assert_eq!(map.record(vec![]).unwrap(), None);
        assert!(map.history().is_empty());
        assert!(map.is_empty());
    }

    #[test]
    fn first_change_uses_previous_as_baseline() {
        let mut map = Map::new();
        map.record(vec![change("ev1", json!({"depth": 10}), json!({"depth": 12}))]).unwrap();
        let h = map.get(&"ev1".to_string()).unwrap();
        assert_eq!(h.baseline(), &json!({"depth": 10}));
        assert_eq!(value(&map, "ev1"), Some(json!({"depth": 12})));
        assert_eq!(value(&map, "other"), None);
    }

    #[test]
    fn undo_and_redo_walk_the_journal() {
        let mut map = Map::new();
        let first = map
            .record(vec![change("a", json!(0), json!(1)), change("b", json!(0), json!(1))])
            .unwrap()
            .unwrap();
        let second = map.record(vec![change("a", json!(1), json!(2))]).unwrap().unwrap();

        assert_eq!(map.undo(1).unwrap(), vec![("a".to_string(), json!(1))]);
        assert_eq!(map.redo_priority(second), Some(1));
        assert_eq!(
            map.undo(5).unwrap(),
            vec![("b".to_string(), json!(0)), ("a".to_string(), json!(0))]
        );
        assert_eq!(map.redo_priority(first), Some(1));
        assert_eq!(map.redo_priority(second), Some(2));
        assert!(map.history().iter().all(|e| !e.is_active()));

        assert_eq!(
            map.redo(1).unwrap(),
            vec![("a".to_string(), json!(1)), ("b".to_string(), json!(1))]
        );
        assert_eq!(map.redo(1).unwrap(), vec![("a".to_string(), json!(2))]);
        assert!(map.redo(1).unwrap().is_empty());
    }

    #[test]
    fn recording_discards_undone_entries() {
        let mut map = Map::new();
        map.record(vec![change("a", json!(0), json!(1))]).unwrap();
        let undone = map.record(vec![change("a", json!(1), json!(2))]).unwrap().unwrap();
        map.undo(1).unwrap();
        map.record(vec![change("a", json!(1), json!(3))]).unwrap();

        assert_eq!(map.history().len(), 2);
        assert_eq!(map.redo_priority(undone), None);
        assert!(map.redo(1).unwrap().is_empty());
        assert_eq!(value(&map, "a"), Some(json!(3)));
        assert_eq!(map.get(&"a".to_string()).unwrap().size(), 3);
    }

    #[test]
    fn undo_through_and_redo_through() {
        let mut map = Map::new();
        let ids: Vec<ChangeId> = (1..=3)
            .map(|n| map.record(vec![change("a", json!(n - 1), json!(n))]).unwrap().unwrap())
            .collect();

        let undone = map.undo_through(ids[1]).unwrap();
        assert_eq!(undone.last(), Some(&("a".to_string(), json!(1))));
        assert_eq!(map.history().iter().filter(|e| e.is_active()).count(), 1);

        map.redo_through(ids[2]).unwrap();
        assert_eq!(value(&map, "a"), Some(json!(3)));
        assert!(map.undo_through(999).unwrap().is_empty());
        assert!(map.redo_through(999).unwrap().is_empty());
    }

    #[test]
    fn groups_undo_and_redo_independently() {
        let mut map = Map::new();
        let e1 = map.record(vec![grouped("ev1", "a", json!(0), json!(1))]).unwrap().unwrap();
        let e2 = map.record(vec![grouped("ev2", "b", json!(0), json!(1))]).unwrap().unwrap();
        let e3 = map.record(vec![grouped("ev1", "a", json!(1), json!(2))]).unwrap().unwrap();

        assert_eq!(map.undo_group(&"ev1".to_string(), 1).unwrap(), vec![("a".to_string(), json!(1))]);
        assert_eq!(value(&map, "b"), Some(json!(1)));
        let ev1 = map.history_for(&"ev1".to_string());
        assert_eq!(ev1.iter().map(|e| e.id).collect::<Vec<_>>(), vec![e1, e3]);
        assert!(!ev1[1].changes[0].active);

        assert_eq!(map.undo_group(&"ev2".to_string(), 1).unwrap(), vec![("b".to_string(), json!(0))]);
        assert_eq!(map.undo(1).unwrap(), vec![("a".to_string(), json!(0))]);
        assert_eq!(map.redo_priority(e1), Some(1));
        assert_eq!(map.redo_priority(e2), Some(2));
        assert_eq!(map.redo_priority(e3), Some(3));

        assert_eq!(
            map.redo_group(&"ev1".to_string(), 5).unwrap(),
            vec![("a".to_string(), json!(1)), ("a".to_string(), json!(2))]
        );
        assert_eq!(map.redo_priority(e2), Some(1));
        assert_eq!(map.redo(1).unwrap(), vec![("b".to_string(), json!(1))]);
        assert!(map.history().iter().all(JournalEntry::is_fully_active));
    }

    #[test]
    fn grouped_record_keeps_other_groups_redo_branch() {
        let mut map = Map::new();
        let e1 = map.record(vec![grouped("ev1", "a", json!(0), json!(1))]).unwrap().unwrap();
        let e2 = map.record(vec![grouped("ev2", "b", json!(0), json!(1))]).unwrap().unwrap();
        map.undo_group(&"ev1".to_string(), 1).unwrap();
        map.undo_group(&"ev2".to_string(), 1).unwrap();

        let e3 = map.record(vec![grouped("ev1", "a", json!(0), json!(5))]).unwrap().unwrap();
        assert_eq!(map.history().iter().map(|e| e.id).collect::<Vec<_>>(), vec![e2, e3]);
        assert_eq!(map.redo_priority(e1), None);
        assert_eq!(map.redo_priority(e2), Some(1));
        assert_eq!(map.redo_group(&"ev2".to_string(), 1).unwrap(), vec![("b".to_string(), json!(1))]);
        assert_eq!(value(&map, "a"), Some(json!(5)));
        assert_eq!(map.get(&"a".to_string()).unwrap().size(), 2);
    }

    #[test]
    fn cross_group_record_discards_partly_undone_entries() {
        let mut map = Map::new();
        map.record(vec![grouped("ev1", "a", json!(0), json!(1))]).unwrap();
        let e2 = map
            .record(vec![grouped("ev1", "a", json!(1), json!(2)), grouped("ev2", "b", json!(0), json!(1))])
            .unwrap()
            .unwrap();
        map.undo_group(&"ev2".to_string(), 1).unwrap();
        assert!(map.history()[1].is_active());
        assert!(!map.history()[1].is_fully_active());

        map.record(vec![grouped("ev1", "a", json!(2), json!(3)), change("c", json!(0), json!(1))])
            .unwrap();
        assert_eq!(map.history().len(), 2);
        assert!(map.history().iter().all(|e| e.id != e2));
        assert_eq!(map.redo_priority(e2), None);
    }

    #[test]
    fn group_through_ranges_skip_other_groups() {
        let mut map = Map::new();
        let a1 = map.record(vec![grouped("ev1", "a", json!(0), json!(1))]).unwrap().unwrap();
        map.record(vec![grouped("ev2", "b", json!(0), json!(1))]).unwrap();
        let a2 = map.record(vec![grouped("ev1", "a", json!(1), json!(2))]).unwrap().unwrap();
        map.record(vec![grouped("ev1", "a", json!(2), json!(3))]).unwrap();

        let undone = map.undo_group_through(&"ev1".to_string(), a1).unwrap();
        assert_eq!(undone.len(), 3);
        assert_eq!(value(&map, "a"), Some(json!(0)));
        assert_eq!(value(&map, "b"), Some(json!(1)));

        map.redo_group_through(&"ev1".to_string(), a2).unwrap();
        assert_eq!(value(&map, "a"), Some(json!(2)));
        assert!(map.history_for(&"ev2".to_string())[0].changes[0].active);
        assert!(map.history_for(&"missing".to_string()).is_empty());
    }

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    struct Reading(i64);

    impl Serialize for Reading {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            if self.0 < 0 {
                return Err(S::Error::custom("negative reading"));
            }
            serializer.serialize_i64(self.0)
        }
    }

    #[test]
    fn failed_record_leaves_map_untouched() {
        let mut map: HistoryMap<String, String, Reading> = HistoryMap::new();
        map.record(vec![Change::new("a".to_string(), Reading(0), Reading(1))]).unwrap();

        let result = map.record(vec![
            Change::new("a".to_string(), Reading(1), Reading(2)),
            Change::new("b".to_string(), Reading(0), Reading(-1)),
        ]);
        assert!(matches!(result, Err(HistoryError::Serialize(_))));
        assert_eq!(map.len(), 1);
        assert_eq!(map.history().len(), 1);
        assert_eq!(map.value(&"a".to_string()).unwrap(), Some(Reading(1)));
        assert_eq!(map.get(&"a".to_string()).unwrap().size(), 2);
    }

    #[test]
    fn clear_forgets_everything() {
        let mut map = Map::new();
        map.record(vec![change("a", json!(0), json!(1))]).unwrap();
        map.clear();
        assert!(map.is_empty());
        assert!(map.history().is_empty());
        assert_eq!(map.len(), 0);
    }
}
