use serde_json::Value;

/// Structural equality between two value trees.
///
/// Object key order is irrelevant. Numbers compare by their exact
/// representation, so `1` and `1.0` differ and large integers never collapse
/// onto the same `f64`.
///
/// ```
/// use serde_json::json;
/// use value_history_patch::deep_equal;
///
/// assert!(deep_equal(&json!({"a": [1, 2], "b": 1.5}), &json!({"b": 1.5, "a": [1, 2]})));
/// assert!(!deep_equal(&json!([1, 2]), &json!([2, 1])));
/// assert!(!deep_equal(&json!(1), &json!(1.0)));
/// ```
pub fn deep_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Array(arr_a), Value::Array(arr_b)) => {
            arr_a.len() == arr_b.len() && arr_a.iter().zip(arr_b).all(|(x, y)| deep_equal(x, y))
        }
        (Value::Object(obj_a), Value::Object(obj_b)) => {
            obj_a.len() == obj_b.len()
                && obj_a
                    .iter()
                    .all(|(key, val_a)| obj_b.get(key).is_some_and(|val_b| deep_equal(val_a, val_b)))
        }
        _ => false,
    }
}
