//! Dotted key paths into the state tree
//!
//! Fragments usually live at top-level keys, but both fragment keys and
//! migration version keys may address nested values (`"counter.version"`).
//! Paths are dot-separated object keys; array indexing is not supported.

use serde_json::{Map, Value};

/// Resolve a dotted path against a value
///
/// Returns `None` if any segment is missing or traverses a non-object.
///
/// # Examples
/// - `get_path(tree, "counter")` → the `counter` fragment
/// - `get_path(tree, "counter.version")` → the nested version marker
#[must_use]
pub fn get_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Set a dotted path in a value, returning the updated tree
///
/// Consumes the tree and returns it with the path set, creating intermediate
/// objects as needed. Non-object intermediates are replaced by objects so
/// the write always lands.
#[must_use]
pub fn set_path(root: Value, path: &str, value: Value) -> Value {
    let mut root = match root {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    set_in_map(&mut root, path, value);
    Value::Object(root)
}

fn set_in_map(map: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            map.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let child = map
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            if let Value::Object(child_map) = child {
                set_in_map(child_map, rest, value);
            }
        }
    }
}
