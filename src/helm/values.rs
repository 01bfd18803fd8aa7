//! Flattening of a chart's `values.local.yaml` into dotted-path pairs

use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};
use serde_yaml::Value as YamlValue;
use std::collections::HashMap;

/// Override file shipped inside Application Collection charts
pub const LOCAL_VALUES_FILE: &str = "values.local.yaml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalValue {
    pub key: String,
    pub value: JsonValue,
}

/// Parse YAML text and flatten it. Empty documents yield no values.
pub fn flatten_yaml(text: &str) -> anyhow::Result<Vec<LocalValue>> {
    let doc: YamlValue = serde_yaml::from_str(text)?;
    Ok(flatten(&doc))
}

/// Flatten a document in document order.
///
/// Map keys join with `.`, sequence items append `[i]`. Empty maps and
/// sequences below the root are kept as `{}` and `[]`. When two paths
/// collide (`a.b` next to `a: {b: ..}`) the key keeps its first position
/// and takes the last value.
pub fn flatten(doc: &YamlValue) -> Vec<LocalValue> {
    let mut out = Vec::new();
    if !doc.is_null() {
        recurse(doc, "", &mut out);
    }
    dedupe_keys(out)
}

fn dedupe_keys(values: Vec<LocalValue>) -> Vec<LocalValue> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<LocalValue> = Vec::with_capacity(values.len());
    for value in values {
        match positions.get(&value.key) {
            Some(&i) => out[i].value = value.value,
            None => {
                positions.insert(value.key.clone(), out.len());
                out.push(value);
            }
        }
    }
    out
}

fn recurse(value: &YamlValue, prop: &str, out: &mut Vec<LocalValue>) {
    match value {
        YamlValue::Mapping(map) => {
            if map.is_empty() {
                if !prop.is_empty() {
                    push(out, prop, json!({}));
                }
                return;
            }
            for (key, child) in map {
                let key = key_string(key);
                let path = if prop.is_empty() {
                    key
                } else {
                    format!("{}.{}", prop, key)
                };
                recurse(child, &path, out);
            }
        }
        YamlValue::Sequence(items) => {
            if items.is_empty() {
                if !prop.is_empty() {
                    push(out, prop, json!([]));
                }
                return;
            }
            for (i, child) in items.iter().enumerate() {
                recurse(child, &format!("{}[{}]", prop, i), out);
            }
        }
        YamlValue::Tagged(tagged) => recurse(&tagged.value, prop, out),
        scalar => push(out, prop, scalar_to_json(scalar)),
    }
}

fn push(out: &mut Vec<LocalValue>, key: &str, value: JsonValue) {
    out.push(LocalValue {
        key: key.to_string(),
        value,
    });
}

fn key_string(key: &YamlValue) -> String {
    match key {
        YamlValue::String(s) => s.clone(),
        YamlValue::Bool(b) => b.to_string(),
        YamlValue::Number(n) => n.to_string(),
        YamlValue::Null => "null".to_string(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

fn scalar_to_json(value: &YamlValue) -> JsonValue {
    match value {
        YamlValue::Null => JsonValue::Null,
        YamlValue::Bool(b) => JsonValue::Bool(*b),
        YamlValue::String(s) => JsonValue::String(s.clone()),
        // Non-finite floats have no JSON form
        YamlValue::Number(n) => serde_json::to_value(n).unwrap_or(JsonValue::Null),
        other => serde_json::to_value(other).unwrap_or(JsonValue::Null),
    }
}
