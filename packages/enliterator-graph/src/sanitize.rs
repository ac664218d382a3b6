//! Property sanitization for Node Loading (§4.4.3).
//!
//! Graph properties may only be null, booleans, numbers, strings, or arrays
//! of primitives. Anything else — maps, arrays of maps, nested arrays, or a
//! polymorphic [`EntityRef`](enliterator_storage::EntityRef) — is rewritten
//! into that shape before it reaches a `MERGE`/`SET` statement.

use std::collections::BTreeMap;

use serde_json::Value;

/// A single property value after sanitization: always a primitive or an
/// array of primitives.
pub type PropertyMap = BTreeMap<String, Value>;

fn is_primitive(value: &Value) -> bool {
    matches!(value, Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_))
}

/// Rewrite one JSON value into the graph property shape: primitives and
/// arrays of primitives pass through; maps, arrays containing maps, and
/// nested arrays are serialized to a JSON string.
pub fn sanitize_value(value: &Value) -> Value {
    match value {
        Value::Object(_) => Value::String(value.to_string()),
        Value::Array(items) => {
            if items.iter().all(is_primitive) {
                Value::Array(items.clone())
            } else {
                Value::String(value.to_string())
            }
        }
        primitive => primitive.clone(),
    }
}

/// Flatten an arbitrary struct (already serialized to `serde_json::Value`)
/// into a property map, sanitizing every field. Structs are expected to
/// serialize to a JSON object; anything else is an implementation error in
/// the caller.
pub fn sanitize_struct(value: &Value) -> PropertyMap {
    let mut out = PropertyMap::new();
    if let Value::Object(map) = value {
        for (key, v) in map {
            out.insert(key.clone(), sanitize_value(v));
        }
    }
    out
}

/// Split a polymorphic `{label, id}` reference into the two primitive
/// columns the graph layer actually stores, named `<prefix>_id` and
/// `<prefix>_type` (§4.4.3, "References to other records").
pub fn split_entity_ref(prefix: &str, label: &str, id: &str, out: &mut PropertyMap) {
    out.insert(format!("{prefix}_id"), Value::String(id.to_string()));
    out.insert(format!("{prefix}_type"), Value::String(label.to_string()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn primitives_pass_through_unchanged() {
        assert_eq!(sanitize_value(&json!("hello")), json!("hello"));
        assert_eq!(sanitize_value(&json!(42)), json!(42));
        assert_eq!(sanitize_value(&json!(null)), json!(null));
    }

    #[test]
    fn array_of_primitives_passes_through() {
        let v = json!(["plan", "execute"]);
        assert_eq!(sanitize_value(&v), v);
    }

    #[test]
    fn nested_object_becomes_json_string() {
        let v = json!({"a": 1});
        let sanitized = sanitize_value(&v);
        assert!(sanitized.is_string());
        assert_eq!(sanitized.as_str().unwrap(), v.to_string());
    }

    #[test]
    fn array_containing_map_becomes_json_string() {
        let v = json!([{"a": 1}, {"b": 2}]);
        assert!(sanitize_value(&v).is_string());
    }

    #[test]
    fn sanitize_struct_flattens_object_fields() {
        let v = json!({"label": "sustainability", "tags": ["idea", "manifesto"]});
        let props = sanitize_struct(&v);
        assert_eq!(props["label"], json!("sustainability"));
        assert_eq!(props["tags"], json!(["idea", "manifesto"]));
    }

    #[test]
    fn entity_ref_splits_into_two_primitive_columns() {
        let mut out = PropertyMap::new();
        split_entity_ref("rights", "ProvenanceAndRights", "r-1", &mut out);
        assert_eq!(out["rights_id"], json!("r-1"));
        assert_eq!(out["rights_type"], json!("ProvenanceAndRights"));
    }
}
