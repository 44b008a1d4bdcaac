//! Dot-path access into JSON-like trees.
//!
//! A dot-path such as `user.address.city` addresses nested mapping keys. Keys
//! are never array indices: sequences are treated as opaque leaf values.

use serde_json::{Map, Value};

/// Look up the value at `path`.
///
/// Returns `None` at the first missing key or when an intermediate node is not
/// a mapping.
pub fn get<'a>(tree: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(tree, |node, key| node.as_object()?.get(key))
}

/// Return a copy of `tree` with `value` assigned at `path`.
///
/// Missing or non-mapping intermediate nodes are replaced by empty mappings.
/// Sibling keys are left untouched.
pub fn set(tree: &Value, path: &str, value: Value) -> Value {
    let mut updated = tree.clone();
    set_in_place(&mut updated, path, value);
    updated
}

/// Assign `value` at `path`, mutating `tree`.
pub fn set_in_place(tree: &mut Value, path: &str, value: Value) {
    let mut keys = path.split('.').peekable();
    let mut current = tree;

    while let Some(key) = keys.next() {
        let map = ensure_object(current);
        if keys.peek().is_none() {
            map.insert(key.to_string(), value);
            return;
        }
        current = map.entry(key).or_insert(Value::Null);
    }
}

fn ensure_object(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just replaced with an object"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_nested() {
        let tree = json!({"user": {"address": {"city": "Oslo"}}, "tags": ["a", "b"]});
        assert_eq!(get(&tree, "user.address.city"), Some(&json!("Oslo")));
        assert_eq!(get(&tree, "user.address"), Some(&json!({"city": "Oslo"})));
        assert_eq!(get(&tree, "tags"), Some(&json!(["a", "b"])));
    }

    #[test]
    fn test_get_missing_is_none() {
        let tree = json!({"user": {"name": "Ada"}, "tags": ["a"]});
        assert_eq!(get(&tree, "user.email"), None);
        assert_eq!(get(&tree, "user.name.first"), None);
        // Sequences are not indexable
        assert_eq!(get(&tree, "tags.0"), None);
        assert_eq!(get(&json!("scalar"), "anything"), None);
    }

    #[test]
    fn test_set_round_trip() {
        let tree = json!({"a": 1});
        for (path, value) in [
            ("a", json!(2)),
            ("b.c", json!("x")),
            ("d.e.f", json!([1, 2])),
            ("g", json!(null)),
        ] {
            let updated = set(&tree, path, value.clone());
            assert_eq!(get(&updated, path), Some(&value));
        }
    }

    #[test]
    fn test_set_preserves_siblings() {
        let tree = json!({"user": {"id": 1, "name": "Ada"}, "meta": {"v": 2}});
        let updated = set(&tree, "user.id", json!(99));
        assert_eq!(
            updated,
            json!({"user": {"id": 99, "name": "Ada"}, "meta": {"v": 2}})
        );
    }

    #[test]
    fn test_set_replaces_non_mapping_intermediates() {
        let tree = json!({"user": "flat", "list": [1, 2]});
        let updated = set(&tree, "user.id", json!(7));
        assert_eq!(updated["user"], json!({"id": 7}));

        let updated = set(&tree, "list.first", json!(true));
        assert_eq!(updated["list"], json!({"first": true}));
    }

    #[test]
    fn test_set_does_not_mutate_input() {
        let tree = json!({"a": {"b": 1}});
        let _ = set(&tree, "a.b", json!(2));
        assert_eq!(tree, json!({"a": {"b": 1}}));
    }

    #[test]
    fn test_set_on_scalar_root() {
        let updated = set(&json!(null), "a.b", json!(1));
        assert_eq!(updated, json!({"a": {"b": 1}}));
    }
}
