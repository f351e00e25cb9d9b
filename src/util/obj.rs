use serde_json::{Map, Value};

/// Shallow merge of `source` into `target`; later keys win. Non-object sources are ignored.
pub fn assign(target: &mut Map<String, Value>, source: &Value) {
    if let Value::Object(map) = source {
        for (key, value) in map {
            target.insert(key.clone(), value.clone());
        }
    }
}

pub fn string_or_null(value: Option<&str>) -> Value {
    value
        .map(|text| Value::String(text.to_string()))
        .unwrap_or(Value::Null)
}
