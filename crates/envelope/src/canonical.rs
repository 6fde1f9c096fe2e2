//! Canonical JSON serialization.
//!
//! Signatures cover the canonical form: object keys sorted recursively, no
//! insignificant whitespace. Array order is significant and preserved.

use serde_json::{Map, Value};

pub fn canonical_json(value: &Value) -> String {
    sort_value(value).to_string()
}

fn sort_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by_key(|(k, _)| k.as_str());
            let mut sorted = Map::new();
            for (k, v) in entries {
                sorted.insert(k.clone(), sort_value(v));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_value).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn keys_are_sorted_recursively() {
        let value = json!({
            "b": 1,
            "a": { "d": [ {"z": 0, "y": 1} ], "c": 3 },
        });
        assert_eq!(
            canonical_json(&value),
            r#"{"a":{"c":3,"d":[{"y":1,"z":0}]},"b":1}"#
        );
    }

    #[test]
    fn arrays_keep_their_order() {
        let value = json!({ "k": [3, 1, 2] });
        assert_eq!(canonical_json(&value), r#"{"k":[3,1,2]}"#);
    }
}
