use serde_json::{Map, Value};

/// Merges `updates` over `base`.
///
/// Object values merge key by key, recursively. Every other value, arrays and
/// `null` included, replaces what was there.
pub fn deep_merge(base: &Value, updates: &Value) -> Value {
    let mut result = match base {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    let Value::Object(updates) = updates else {
        return Value::Object(result);
    };

    for (key, update) in updates {
        let merged = match update {
            Value::Object(_) => {
                let existing = result.get(key).cloned().unwrap_or(Value::Null);
                deep_merge(&existing, update)
            }
            other => other.clone(),
        };
        result.insert(key.clone(), merged);
    }
    Value::Object(result)
}
