//! JSON codec for patch operations.
//!
//! Each op is encoded as `{"op": "add" | "remove" | "replace", "path": <RFC 6901
//! pointer>, "value": <any>}`; `value` is omitted for `remove`. This is also the
//! serde representation of [`Op`], so persisted history logs use it verbatim.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map, Value};
use value_history_pointer::{format_json_pointer, parse_json_pointer, validate_json_pointer};

use crate::types::{Op, PatchError, Path};

// ── Path helpers ──────────────────────────────────────────────────────────

fn decode_path(v: Option<&Value>) -> Result<Path, PatchError> {
    let s = v
        .and_then(Value::as_str)
        .ok_or_else(|| PatchError::InvalidOp("path must be a string".into()))?;
    validate_json_pointer(s).map_err(|e| PatchError::InvalidOp(format!("path {s:?}: {e}")))?;
    Ok(parse_json_pointer(s))
}

fn decode_value(obj: &Map<String, Value>, op: &str) -> Result<Value, PatchError> {
    obj.get("value")
        .cloned()
        .ok_or_else(|| PatchError::InvalidOp(format!("{op} requires a value")))
}

// ── Serialization ─────────────────────────────────────────────────────────

pub fn to_json(op: &Op) -> Value {
    match op {
        Op::Add { path, value } => json!({
            "op": "add",
            "path": format_json_pointer(path),
            "value": value
        }),
        Op::Remove { path } => json!({
            "op": "remove",
            "path": format_json_pointer(path)
        }),
        Op::Replace { path, value } => json!({
            "op": "replace",
            "path": format_json_pointer(path),
            "value": value
        }),
    }
}

pub fn to_json_patch(ops: &[Op]) -> Value {
    Value::Array(ops.iter().map(to_json).collect())
}

// ── Deserialization ───────────────────────────────────────────────────────

pub fn from_json(v: &Value) -> Result<Op, PatchError> {
    let obj = v
        .as_object()
        .ok_or_else(|| PatchError::InvalidOp("op must be an object".into()))?;
    let name = obj
        .get("op")
        .and_then(Value::as_str)
        .ok_or_else(|| PatchError::InvalidOp("missing op".into()))?;
    let path = decode_path(obj.get("path"))?;
    match name {
        "add" => Ok(Op::Add { path, value: decode_value(obj, name)? }),
        "remove" => Ok(Op::Remove { path }),
        "replace" => Ok(Op::Replace { path, value: decode_value(obj, name)? }),
        other => Err(PatchError::InvalidOp(format!("unknown op: {other}"))),
    }
}

pub fn from_json_patch(v: &Value) -> Result<Vec<Op>, PatchError> {
    v.as_array()
        .ok_or_else(|| PatchError::InvalidOp("patch must be an array".into()))?
        .iter()
        .map(from_json)
        .collect()
}

impl Serialize for Op {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        to_json(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Op {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        from_json(&raw).map_err(D::Error::custom)
    }
}
