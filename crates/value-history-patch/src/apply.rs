//! Patch replay.

use serde_json::Value;
use value_history_pointer::{get_mut, is_valid_index};

use crate::types::{Op, PatchError};

// ── Path navigation ───────────────────────────────────────────────────────

/// Splits `path` into the container that holds the target and the last step.
fn parent_of<'a, 'p>(
    doc: &'a mut Value,
    path: &'p [String],
) -> Result<(&'a mut Value, &'p String), PatchError> {
    let (key, parent_path) = path.split_last().ok_or(PatchError::InvalidTarget)?;
    let parent = get_mut(doc, parent_path).ok_or(PatchError::NotFound)?;
    Ok((parent, key))
}

fn array_index(key: &str) -> Result<usize, PatchError> {
    if !is_valid_index(key) {
        return Err(PatchError::InvalidIndex);
    }
    key.parse().map_err(|_| PatchError::InvalidIndex)
}

// ── Individual operation applicators ─────────────────────────────────────

fn apply_add(doc: &mut Value, path: &[String], value: Value) -> Result<Option<Value>, PatchError> {
    if path.is_empty() {
        return Ok(Some(std::mem::replace(doc, value)));
    }
    let (parent, key) = parent_of(doc, path)?;
    match parent {
        Value::Object(map) => Ok(map.insert(key.clone(), value)),
        Value::Array(arr) => {
            if key == "-" {
                arr.push(value);
                return Ok(None);
            }
            let idx = array_index(key)?;
            if idx > arr.len() {
                return Err(PatchError::InvalidIndex);
            }
            arr.insert(idx, value);
            Ok(None)
        }
        _ => Err(PatchError::InvalidTarget),
    }
}

fn apply_remove(doc: &mut Value, path: &[String]) -> Result<Option<Value>, PatchError> {
    let (parent, key) = parent_of(doc, path)?;
    match parent {
        Value::Object(map) => map.remove(key).ok_or(PatchError::NotFound).map(Some),
        Value::Array(arr) => {
            let idx = array_index(key)?;
            if idx >= arr.len() {
                return Err(PatchError::NotFound);
            }
            Ok(Some(arr.remove(idx)))
        }
        _ => Err(PatchError::InvalidTarget),
    }
}

fn apply_replace(doc: &mut Value, path: &[String], value: Value) -> Result<Option<Value>, PatchError> {
    if path.is_empty() {
        return Ok(Some(std::mem::replace(doc, value)));
    }
    let (parent, key) = parent_of(doc, path)?;
    match parent {
        Value::Object(map) => {
            let slot = map.get_mut(key).ok_or(PatchError::NotFound)?;
            Ok(Some(std::mem::replace(slot, value)))
        }
        Value::Array(arr) => {
            let idx = array_index(key)?;
            let slot = arr.get_mut(idx).ok_or(PatchError::NotFound)?;
            Ok(Some(std::mem::replace(slot, value)))
        }
        _ => Err(PatchError::InvalidTarget),
    }
}

// ── Main apply functions ──────────────────────────────────────────────────

/// Applies a single operation in place.
///
/// Returns the value displaced by the operation, if any.
pub fn apply_op(doc: &mut Value, op: &Op) -> Result<Option<Value>, PatchError> {
    match op {
        Op::Add { path, value } => apply_add(doc, path, value.clone()),
        Op::Remove { path } => apply_remove(doc, path),
        Op::Replace { path, value } => apply_replace(doc, path, value.clone()),
    }
}

/// Applies `ops` in order and returns the resulting document.
pub fn apply_ops(mut doc: Value, ops: &[Op]) -> Result<Value, PatchError> {
    for op in ops {
        apply_op(&mut doc, op)?;
    }
    Ok(doc)
}
