//! Key/index lookup over a parsed JSON tree.
//!
//! Thin helpers for nested navigation. There is no array length query;
//! iterate from index 0 until the lookup returns `None`.

use serde_json::Value;

/// Get the value for a key in a JSON object.
///
/// Returns `None` when `parent` is not an object or lacks the key.
pub fn value_for_key<'a>(parent: &'a Value, key: &str) -> Option<&'a Value> {
    parent.as_object()?.get(key)
}

/// Get the value at an index in a JSON array.
///
/// Returns `None` when `parent` is not an array or the index is out of
/// range.
pub fn value_at_index(parent: &Value, index: usize) -> Option<&Value> {
    parent.as_array()?.get(index)
}
