//! Wire codec for Nexus JSON result rows
//!
//! The server returns `{"columns": [...], "rows": [[...], ...]}`. Graph
//! entities inside a row are JSON objects carrying reserved keys:
//!
//! ```text
//! node          {"_nexus_id": 7, "_nexus_labels": ["User"], "name": "Vince"}
//! relationship  {"_nexus_id": 3, "_nexus_type": "RATED",
//!                "_nexus_start": 7, "_nexus_end": 9, "stars": 4}
//! path          {"_nexus_path": {"nodes": [...], "relationships": [...]}}
//! ```
//!
//! Properties may also be nested under a `properties` object. Any other
//! object decodes as a map.

use crate::error::{OgmError, Result};
use crate::value::{NodeRef, PathRef, Properties, RelationshipRef, Value};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;

/// Store identity key
pub const ID_KEY: &str = "_nexus_id";
/// Node labels key
pub const LABELS_KEY: &str = "_nexus_labels";
/// Relationship type key
pub const TYPE_KEY: &str = "_nexus_type";
/// Relationship start node key
pub const START_KEY: &str = "_nexus_start";
/// Relationship end node key
pub const END_KEY: &str = "_nexus_end";
/// Path envelope key
pub const PATH_KEY: &str = "_nexus_path";
/// Optional nested property object
pub const PROPERTIES_KEY: &str = "properties";

/// Decode one wire value
pub fn decode_value(json: &JsonValue) -> Result<Value> {
    match json {
        JsonValue::Null => Ok(Value::Null),
        JsonValue::Bool(b) => Ok(Value::Boolean(*b)),
        JsonValue::Number(n) => decode_number(n),
        JsonValue::String(s) => Ok(Value::String(s.clone())),
        JsonValue::Array(items) => items
            .iter()
            .map(decode_value)
            .collect::<Result<Vec<_>>>()
            .map(Value::List),
        JsonValue::Object(obj) => decode_object(obj),
    }
}

/// Decode a full wire row
pub fn decode_row(values: &[JsonValue]) -> Result<Vec<Value>> {
    values.iter().map(decode_value).collect()
}

fn decode_number(n: &serde_json::Number) -> Result<Value> {
    if let Some(i) = n.as_i64() {
        return Ok(Value::Integer(i));
    }
    if n.is_u64() {
        return Err(OgmError::decode(format!("integer out of range: {}", n)));
    }
    n.as_f64()
        .map(Value::Float)
        .ok_or_else(|| OgmError::decode(format!("unrepresentable number {}", n)))
}

fn decode_object(obj: &Map<String, JsonValue>) -> Result<Value> {
    if let Some(path) = obj.get(PATH_KEY) {
        return decode_path(path).map(Value::Path);
    }
    if obj.contains_key(ID_KEY) {
        if obj.contains_key(TYPE_KEY) {
            return decode_relationship(obj).map(Value::Relationship);
        }
        return decode_node(obj).map(Value::Node);
    }

    let mut map = BTreeMap::new();
    for (key, value) in obj {
        map.insert(key.clone(), decode_value(value)?);
    }
    Ok(Value::Map(map))
}

fn decode_id(obj: &Map<String, JsonValue>, key: &str) -> Result<u64> {
    obj.get(key)
        .and_then(JsonValue::as_u64)
        .ok_or_else(|| OgmError::decode(format!("missing or invalid '{}'", key)))
}

fn decode_properties(obj: &Map<String, JsonValue>) -> Result<Properties> {
    let mut properties = Properties::new();
    if let Some(JsonValue::Object(nested)) = obj.get(PROPERTIES_KEY) {
        for (key, value) in nested {
            properties.insert(key.clone(), decode_value(value)?);
        }
    }
    for (key, value) in obj {
        if key.starts_with("_nexus_") || key == PROPERTIES_KEY {
            continue;
        }
        properties.insert(key.clone(), decode_value(value)?);
    }
    Ok(properties)
}

/// Decode a node object
pub fn decode_node(obj: &Map<String, JsonValue>) -> Result<NodeRef> {
    let id = decode_id(obj, ID_KEY)?;
    let labels = match obj.get(LABELS_KEY) {
        None | Some(JsonValue::Null) => Vec::new(),
        Some(JsonValue::Array(labels)) => labels
            .iter()
            .map(|l| {
                l.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| OgmError::decode(format!("node {} has a non-string label", id)))
            })
            .collect::<Result<Vec<_>>>()?,
        Some(other) => {
            return Err(OgmError::decode(format!(
                "node {} labels must be an array, got {}",
                id, other
            )));
        }
    };
    Ok(NodeRef::new(id, labels, decode_properties(obj)?))
}

/// Decode a relationship object
pub fn decode_relationship(obj: &Map<String, JsonValue>) -> Result<RelationshipRef> {
    let id = decode_id(obj, ID_KEY)?;
    let rel_type = obj
        .get(TYPE_KEY)
        .and_then(JsonValue::as_str)
        .ok_or_else(|| OgmError::decode(format!("relationship {} has no type", id)))?
        .to_string();
    Ok(RelationshipRef {
        id,
        rel_type,
        start_id: decode_id(obj, START_KEY)?,
        end_id: decode_id(obj, END_KEY)?,
        properties: decode_properties(obj)?,
    })
}

fn decode_path(json: &JsonValue) -> Result<PathRef> {
    let obj = json
        .as_object()
        .ok_or_else(|| OgmError::decode("path envelope must be an object"))?;

    let mut nodes = Vec::new();
    if let Some(JsonValue::Array(items)) = obj.get("nodes") {
        for item in items {
            let node = item
                .as_object()
                .ok_or_else(|| OgmError::decode("path node must be an object"))?;
            nodes.push(decode_node(node)?);
        }
    }

    let mut relationships = Vec::new();
    if let Some(JsonValue::Array(items)) = obj.get("relationships") {
        for item in items {
            let rel = item
                .as_object()
                .ok_or_else(|| OgmError::decode("path relationship must be an object"))?;
            relationships.push(decode_relationship(rel)?);
        }
    }

    Ok(PathRef {
        nodes,
        relationships,
    })
}
