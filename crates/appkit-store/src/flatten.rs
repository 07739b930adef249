//! Conversion between nested JSON objects and flat separator-joined maps.
//!
//! `{"a": {"b": 1}, "c": 2}` flattens to `{"a.b": 1, "c": 2}` with `.` as the
//! separator, and unflattens back. The two are exact inverses for trees that
//! contain no empty objects (an empty object has no leaves to flatten).

use serde_json::{Map, Value};

/// Flattens a nested object into `joined-path → leaf` pairs.
pub fn flatten(map: &Map<String, Value>, separator: &str) -> Map<String, Value> {
    let mut out = Map::new();
    flatten_into(&mut out, None, map, separator);
    out
}

fn flatten_into(
    out: &mut Map<String, Value>,
    prefix: Option<&str>,
    map: &Map<String, Value>,
    separator: &str,
) {
    for (key, value) in map {
        let path = match prefix {
            Some(prefix) => format!("{}{}{}", prefix, separator, key),
            None => key.clone(),
        };

        match value {
            Value::Object(inner) => flatten_into(out, Some(&path), inner, separator),
            leaf => {
                out.insert(path, leaf.clone());
            }
        }
    }
}

/// Rebuilds a nested object from `joined-path → value` pairs.
///
/// Keys are applied in map order. A path that runs through an existing leaf
/// replaces that leaf with an object, the same way [`Store::set`](crate::Store::set)
/// does.
pub fn unflatten(map: &Map<String, Value>, separator: &str) -> Map<String, Value> {
    let mut root = Map::new();

    for (path, value) in map {
        let mut parts: Vec<&str> = path.split(separator).collect();
        let leaf = parts.pop().unwrap_or_default();

        let mut node = &mut root;
        for part in parts {
            let slot = node
                .entry(part.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            node = ensure_namespace(slot);
        }

        node.insert(leaf.to_string(), value.clone());
    }

    root
}

/// Turns `slot` into an object if it holds anything else and returns it.
pub(crate) fn ensure_namespace(slot: &mut Value) -> &mut Map<String, Value> {
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    match slot {
        Value::Object(map) => map,
        _ => unreachable!("slot was just replaced with an object"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_flatten_nested() {
        let tree = obj(json!({"a": {"b": {"c": 3}, "k": 1}, "x": "y"}));
        let flat = flatten(&tree, ".");

        assert_eq!(
            Value::Object(flat),
            json!({"a.b.c": 3, "a.k": 1, "x": "y"})
        );
    }

    #[test]
    fn test_flatten_custom_separator() {
        let tree = obj(json!({"a": {"b": 1}}));
        let flat = flatten(&tree, "/");
        assert_eq!(Value::Object(flat), json!({"a/b": 1}));
    }

    #[test]
    fn test_flatten_keeps_arrays_as_leaves() {
        let tree = obj(json!({"a": [1, {"b": 2}]}));
        let flat = flatten(&tree, ".");
        assert_eq!(Value::Object(flat), json!({"a": [1, {"b": 2}]}));
    }

    #[test]
    fn test_flatten_drops_empty_objects() {
        let tree = obj(json!({"a": {}, "b": 1}));
        assert_eq!(Value::Object(flatten(&tree, ".")), json!({"b": 1}));
    }

    #[test]
    fn test_unflatten() {
        let flat = obj(json!({"a.b.c": 3, "a.k": 1, "x": "y"}));
        assert_eq!(
            Value::Object(unflatten(&flat, ".")),
            json!({"a": {"b": {"c": 3}, "k": 1}, "x": "y"})
        );
    }

    #[test]
    fn test_unflatten_overwrites_leaf_ancestor() {
        let flat = obj(json!({"a": 1, "a.b": 2}));
        assert_eq!(Value::Object(unflatten(&flat, ".")), json!({"a": {"b": 2}}));
    }

    #[test]
    fn test_round_trip() {
        let tree = obj(json!({"db": {"host": "localhost", "port": 5432}, "debug": true}));
        assert_eq!(unflatten(&flatten(&tree, "."), "."), tree);
    }
}
