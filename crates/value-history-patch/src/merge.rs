//! Merge-recording diff.
//!
//! Overlays the updated value onto a draft of the original the way a deep
//! merge does, and records each mutation of the draft as a forward op plus
//! the op that reverts it. Merge semantics cannot express removals: keys
//! missing from the update are kept and arrays never shrink. The resulting
//! draft therefore has to be compared against the update by the caller
//! (see [`crate::determine_changes`]).

use serde_json::Value;

use crate::equal::deep_equal;
use crate::types::{Op, PatchSet, Path};

/// Result of overlaying one value onto another.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    /// The draft after the merge. Equal to the update only when merge
    /// semantics could express the whole change.
    pub result: Value,
    /// The recorded mutations.
    pub changes: PatchSet,
}

#[derive(Default)]
struct Recorder {
    forward: Vec<Op>,
    inverse: Vec<Op>,
}

impl Recorder {
    fn added(&mut self, path: &Path, value: &Value) {
        self.forward.push(Op::Add { path: path.clone(), value: value.clone() });
        self.inverse.push(Op::Remove { path: path.clone() });
    }

    fn replaced(&mut self, path: &Path, old: Value, value: &Value) {
        self.forward.push(Op::Replace { path: path.clone(), value: value.clone() });
        self.inverse.push(Op::Replace { path: path.clone(), value: old });
    }

    fn finish(mut self) -> PatchSet {
        self.inverse.reverse();
        PatchSet { forward: self.forward, inverse: self.inverse }
    }
}

/// Deep-merges `updated` into a copy of `original`, recording the patches.
///
/// ```
/// use serde_json::json;
/// use value_history_patch::merge_diff;
///
/// let outcome = merge_diff(&json!({"a": 1, "b": [1, 2]}), &json!({"a": 2, "b": [1, 2]}));
/// assert_eq!(outcome.result, json!({"a": 2, "b": [1, 2]}));
/// assert_eq!(outcome.changes.forward.len(), 1);
/// ```
pub fn merge_diff(original: &Value, updated: &Value) -> MergeOutcome {
    let mut draft = original.clone();
    let mut recorder = Recorder::default();
    let mut path = Path::new();
    merge_node(&mut draft, updated, &mut path, &mut recorder);
    MergeOutcome { result: draft, changes: recorder.finish() }
}

fn merge_node(target: &mut Value, src: &Value, path: &mut Path, rec: &mut Recorder) {
    if let (Value::Object(t), Value::Object(s)) = (&mut *target, src) {
        for (key, src_val) in s {
            path.push(key.clone());
            match t.get_mut(key) {
                Some(existing) => merge_node(existing, src_val, path, rec),
                None => {
                    t.insert(key.clone(), src_val.clone());
                    rec.added(path, src_val);
                }
            }
            path.pop();
        }
        return;
    }
    if let (Value::Array(t), Value::Array(s)) = (&mut *target, src) {
        for (idx, src_val) in s.iter().enumerate() {
            path.push(idx.to_string());
            match t.get_mut(idx) {
                Some(existing) => merge_node(existing, src_val, path, rec),
                None => {
                    t.push(src_val.clone());
                    rec.added(path, src_val);
                }
            }
            path.pop();
        }
        return;
    }
    if !deep_equal(target, src) {
        let old = std::mem::replace(target, src.clone());
        rec.replaced(path, old, src);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apply::apply_ops;
    use serde_json::json;

    fn p(steps: &[&str]) -> Path {
        steps.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn identical_values_record_nothing() {
        let v = json!({"a": [1, {"b": "c"}]});
        let outcome = merge_diff(&v, &v);
        assert!(outcome.changes.is_empty());
        assert_eq!(outcome.result, v);
    }

    #[test]
    fn nested_scalar_change_is_one_replace() {
        let outcome = merge_diff(
            &json!({"obj": {"value": "my object"}, "n": 1}),
            &json!({"obj": {"value": "updated"}, "n": 1}),
        );
        assert_eq!(
            outcome.changes.forward,
            vec![Op::Replace { path: p(&["obj", "value"]), value: json!("updated") }]
        );
        assert_eq!(
            outcome.changes.inverse,
            vec![Op::Replace { path: p(&["obj", "value"]), value: json!("my object") }]
        );
    }

    #[test]
    fn new_keys_are_added_and_removed_on_inverse() {
        let outcome = merge_diff(&json!({"a": 1}), &json!({"a": 1, "b": {"c": 2}}));
        assert_eq!(outcome.changes.forward, vec![Op::Add { path: p(&["b"]), value: json!({"c": 2}) }]);
        assert_eq!(outcome.changes.inverse, vec![Op::Remove { path: p(&["b"]) }]);
    }

    #[test]
    fn array_growth_appends_and_inverse_pops_in_reverse() {
        let original = json!([1]);
        let updated = json!([1, 2, 3]);
        let outcome = merge_diff(&original, &updated);
        assert_eq!(outcome.result, updated);
        assert_eq!(
            outcome.changes.inverse,
            vec![Op::Remove { path: p(&["2"]) }, Op::Remove { path: p(&["1"]) }]
        );
        assert_eq!(apply_ops(updated, &outcome.changes.inverse).unwrap(), original);
    }

    #[test]
    fn reordered_array_merges_per_index() {
        let outcome = merge_diff(&json!([1, 2, 3, 4, 5]), &json!([1, 4, 3, 2, 5]));
        assert_eq!(outcome.result, json!([1, 4, 3, 2, 5]));
        assert_eq!(outcome.changes.forward.len(), 2);
    }

    #[test]
    fn kind_change_replaces_node() {
        let outcome = merge_diff(&json!({"a": [1, 2]}), &json!({"a": {"0": 1}}));
        assert_eq!(outcome.changes.forward, vec![Op::Replace { path: p(&["a"]), value: json!({"0": 1}) }]);
    }

    #[test]
    fn root_scalar_replaced() {
        let outcome = merge_diff(&Value::Null, &json!({"a": 1}));
        assert_eq!(outcome.changes.forward, vec![Op::Replace { path: vec![], value: json!({"a": 1}) }]);
        assert_eq!(outcome.changes.inverse, vec![Op::Replace { path: vec![], value: Value::Null }]);
    }

    #[test]
    fn missing_keys_survive_the_merge() {
        let outcome = merge_diff(&json!({"a": 1, "b": "x"}), &json!({"a": 1}));
        assert_eq!(outcome.result, json!({"a": 1, "b": "x"}));
        assert!(outcome.changes.is_empty());
    }

    #[test]
    fn shorter_array_keeps_tail() {
        let outcome = merge_diff(&json!([1, 2, 3]), &json!([9]));
        assert_eq!(outcome.result, json!([9, 2, 3]));
    }
}
