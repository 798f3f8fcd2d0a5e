//! JSON Pointer (RFC 6901) paths for addressing nodes inside a value tree.
//!
//! # Example
//!
//! ```
//! use value_history_pointer::{format_json_pointer, get_mut, parse_json_pointer};
//!
//! let path = parse_json_pointer("/station/channels/0");
//! assert_eq!(path, vec!["station", "channels", "0"]);
//! assert_eq!(format_json_pointer(&path), "/station/channels/0");
//!
//! let mut doc = serde_json::json!({"station": {"channels": ["BHZ"]}});
//! *get_mut(&mut doc, &path).unwrap() = serde_json::json!("BHN");
//! assert_eq!(doc["station"]["channels"][0], "BHN");
//! ```

use serde_json::Value;
use thiserror::Error;

pub mod types;
pub use types::{Path, PathStep};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PointerError {
    #[error("POINTER_INVALID")]
    PointerInvalid,
}

/// Unescapes a pointer component: `~1` becomes `/`, then `~0` becomes `~`.
///
/// ```
/// use value_history_pointer::unescape_component;
///
/// assert_eq!(unescape_component("a~0b"), "a~b");
/// assert_eq!(unescape_component("c~1d"), "c/d");
/// ```
pub fn unescape_component(component: &str) -> String {
    if !component.contains('~') {
        return component.to_string();
    }
    // ~1 before ~0, otherwise "~01" would decode to "/"
    component.replace("~1", "/").replace("~0", "~")
}

/// Escapes a pointer component: `~` becomes `~0`, then `/` becomes `~1`.
///
/// ```
/// use value_history_pointer::escape_component;
///
/// assert_eq!(escape_component("a~b"), "a~0b");
/// assert_eq!(escape_component("c/d"), "c~1d");
/// ```
pub fn escape_component(component: &str) -> String {
    if !component.contains('/') && !component.contains('~') {
        return component.to_string();
    }
    component.replace('~', "~0").replace('/', "~1")
}

/// Parses a pointer string into path steps. The empty string is the root.
pub fn parse_json_pointer(pointer: &str) -> Path {
    if pointer.is_empty() {
        return Vec::new();
    }
    let rest = pointer.strip_prefix('/').unwrap_or(pointer);
    rest.split('/').map(unescape_component).collect()
}

/// Formats path steps as a pointer string. The root formats as `""`.
pub fn format_json_pointer(path: &[String]) -> String {
    let mut out = String::with_capacity(path.len() * 8);
    for step in path {
        out.push('/');
        out.push_str(&escape_component(step));
    }
    out
}

/// Checks that a pointer string is either empty or starts with `/`.
///
/// Any length is accepted: every path a diff can produce must decode again.
pub fn validate_json_pointer(pointer: &str) -> Result<(), PointerError> {
    if pointer.is_empty() || pointer.starts_with('/') {
        Ok(())
    } else {
        Err(PointerError::PointerInvalid)
    }
}

/// Returns true for canonical decimal array indices (`"0"`, `"17"`, not `"07"`).
pub fn is_valid_index(step: &str) -> bool {
    let bytes = step.as_bytes();
    if bytes.is_empty() || (bytes.len() > 1 && bytes[0] == b'0') {
        return false;
    }
    bytes.iter().all(u8::is_ascii_digit)
}

/// Resolves `path` inside `val` for in-place edits. Returns `None` when any
/// step is missing.
pub fn get_mut<'a>(val: &'a mut Value, path: &[String]) -> Option<&'a mut Value> {
    let mut current = val;
    for step in path {
        current = match current {
            Value::Array(arr) => arr.get_mut(parse_index(step)?)?,
            Value::Object(map) => map.get_mut(step)?,
            _ => return None,
        };
    }
    Some(current)
}

fn parse_index(step: &str) -> Option<usize> {
    if !is_valid_index(step) {
        return None;
    }
    step.parse().ok()
}
