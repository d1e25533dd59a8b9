//! Access to an integration's top-level section of configuration.yaml

use serde_yaml::Value;

/// The top-level section for `domain`, if present and not null
///
/// A bare `mqtt:` line yields a null value and counts as absent.
pub fn integration_config<'a>(root: &'a Value, domain: &str) -> Option<&'a Value> {
    root.as_mapping()?
        .get(&Value::String(domain.to_string()))
        .filter(|section| !section.is_null())
}

/// Render a YAML scalar as a string; None for null, sequences and mappings
///
/// `1234` becomes `"1234"`.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(tagged) => scalar_to_string(&tagged.value),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

/// Convert a YAML value to JSON, e.g. for event payloads
///
/// Mapping keys that are not strings are rendered with `scalar_to_string`;
/// entries whose keys cannot be rendered are dropped.
pub fn to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                serde_json::Value::from(i)
            } else if let Some(u) = n.as_u64() {
                serde_json::Value::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(serde_json::Value::Number)
                    .unwrap_or(serde_json::Value::Null)
            }
        }
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Sequence(seq) => serde_json::Value::Array(seq.iter().map(to_json).collect()),
        Value::Mapping(map) => serde_json::Value::Object(
            map.iter()
                .filter_map(|(k, v)| scalar_to_string(k).map(|key| (key, to_json(v))))
                .collect(),
        ),
        Value::Tagged(tagged) => to_json(&tagged.value),
    }
}
