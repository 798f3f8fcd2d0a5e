//! Structural diff: generate the ops that transform one value into another.
//!
//! Unlike [`crate::merge_diff`] this differ can express removals, so it
//! handles dropped keys and shrinking arrays without falling back to a
//! whole-value replacement.

use serde_json::{Map, Value};

use crate::equal::deep_equal;
use crate::types::{Op, PatchSet, Path};

// ── Public API ────────────────────────────────────────────────────────────

/// Generate the ops that transform `src` into `dst`.
pub fn diff(src: &Value, dst: &Value) -> Vec<Op> {
    let mut ops = Vec::new();
    diff_at_path(&mut ops, &mut Path::new(), src, dst);
    ops
}

/// Forward and inverse patches between two values.
pub fn structural_diff(original: &Value, updated: &Value) -> PatchSet {
    PatchSet {
        forward: diff(original, updated),
        inverse: diff(updated, original),
    }
}

// ── Core recursive differ ─────────────────────────────────────────────────

fn diff_at_path(ops: &mut Vec<Op>, path: &mut Path, src: &Value, dst: &Value) {
    if deep_equal(src, dst) {
        return;
    }
    match (src, dst) {
        (Value::Object(s), Value::Object(d)) => diff_obj(ops, path, s, d),
        (Value::Array(s), Value::Array(d)) => diff_arr(ops, path, s, d),
        _ => ops.push(Op::Replace { path: path.clone(), value: dst.clone() }),
    }
}

fn diff_obj(ops: &mut Vec<Op>, path: &mut Path, src: &Map<String, Value>, dst: &Map<String, Value>) {
    for key in src.keys().filter(|k| !dst.contains_key(*k)) {
        path.push(key.clone());
        ops.push(Op::Remove { path: path.clone() });
        path.pop();
    }
    for (key, dst_val) in dst {
        path.push(key.clone());
        match src.get(key) {
            None => ops.push(Op::Add { path: path.clone(), value: dst_val.clone() }),
            Some(src_val) => diff_at_path(ops, path, src_val, dst_val),
        }
        path.pop();
    }
}

/// Trims the common prefix and suffix, diffs the overlapping middle element
/// by element, then inserts or removes the remainder.
fn diff_arr(ops: &mut Vec<Op>, path: &mut Path, src: &[Value], dst: &[Value]) {
    let prefix = src.iter().zip(dst).take_while(|(s, d)| deep_equal(s, d)).count();
    let max_suffix = src.len().min(dst.len()) - prefix;
    let suffix = src[prefix..]
        .iter()
        .rev()
        .zip(dst[prefix..].iter().rev())
        .take(max_suffix)
        .take_while(|(s, d)| deep_equal(s, d))
        .count();

    let src_mid = &src[prefix..src.len() - suffix];
    let dst_mid = &dst[prefix..dst.len() - suffix];
    let common = src_mid.len().min(dst_mid.len());

    for (i, (s, d)) in src_mid.iter().zip(dst_mid).enumerate() {
        path.push((prefix + i).to_string());
        diff_at_path(ops, path, s, d);
        path.pop();
    }
    for (i, d) in dst_mid.iter().enumerate().skip(common) {
        path.push((prefix + i).to_string());
        ops.push(Op::Add { path: path.clone(), value: d.clone() });
        path.pop();
    }
    // highest index first so earlier removals don't shift later ones
    for i in (common..src_mid.len()).rev() {
        path.push((prefix + i).to_string());
        ops.push(Op::Remove { path: path.clone() });
        path.pop();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────
