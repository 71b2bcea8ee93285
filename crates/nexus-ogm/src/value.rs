//! Wire values as decoded from a query result
//!
//! These are the raw shapes handed over by the executor, before any class
//! resolution happens. Integers always travel as `i64`.

use crate::error::{OgmError, Result};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Property bag of a node or relationship
pub type Properties = BTreeMap<String, Value>;

/// A decoded wire value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null / missing value
    Null,
    /// Boolean value
    Boolean(bool),
    /// Integer value, always carried at full width
    Integer(i64),
    /// Floating point value
    Float(f64),
    /// String value
    String(String),
    /// Ordered list (Cypher list or property array)
    List(Vec<Value>),
    /// Map projection or literal map
    Map(BTreeMap<String, Value>),
    /// Graph node
    Node(NodeRef),
    /// Graph relationship
    Relationship(RelationshipRef),
    /// Traversal path
    Path(PathRef),
}

impl Value {
    /// Whether the value is a plain scalar (null, bool, number, string)
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Value::Null | Value::Boolean(_) | Value::Integer(_) | Value::Float(_) | Value::String(_)
        )
    }

    /// Whether the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Name of the wire kind, used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Boolean(_) => "Boolean",
            Value::Integer(_) => "Integer",
            Value::Float(_) => "Float",
            Value::String(_) => "String",
            Value::List(_) => "List",
            Value::Map(_) => "Map",
            Value::Node(_) => "Node",
            Value::Relationship(_) => "Relationship",
            Value::Path(_) => "Path",
        }
    }

    /// Visit every node reachable from this value, depth first
    pub fn for_each_node<'a>(&'a self, visit: &mut dyn FnMut(&'a NodeRef)) {
        match self {
            Value::Node(node) => visit(node),
            Value::Path(path) => path.nodes.iter().for_each(|n| visit(n)),
            Value::List(items) => items.iter().for_each(|v| v.for_each_node(visit)),
            Value::Map(map) => map.values().for_each(|v| v.for_each_node(visit)),
            _ => {}
        }
    }

    /// Visit every relationship reachable from this value, depth first
    pub fn for_each_relationship<'a>(&'a self, visit: &mut dyn FnMut(&'a RelationshipRef)) {
        match self {
            Value::Relationship(rel) => visit(rel),
            Value::Path(path) => path.relationships.iter().for_each(|r| visit(r)),
            Value::List(items) => items.iter().for_each(|v| v.for_each_relationship(visit)),
            Value::Map(map) => map.values().for_each(|v| v.for_each_relationship(visit)),
            _ => {}
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

/// A node as seen on the wire
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRef {
    /// Store identity
    pub id: u64,
    /// Labels, unique, order irrelevant
    pub labels: Vec<String>,
    /// Properties
    pub properties: Properties,
}

impl NodeRef {
    /// Create a node reference
    pub fn new(id: u64, labels: Vec<String>, properties: Properties) -> Self {
        let mut labels = labels;
        let mut seen = std::collections::HashSet::new();
        labels.retain(|label| seen.insert(label.clone()));
        Self {
            id,
            labels,
            properties,
        }
    }
}

/// A relationship as seen on the wire
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipRef {
    /// Store identity
    pub id: u64,
    /// Relationship type
    pub rel_type: String,
    /// Start node identity
    pub start_id: u64,
    /// End node identity
    pub end_id: u64,
    /// Properties
    pub properties: Properties,
}

/// A path as seen on the wire
#[derive(Debug, Clone, PartialEq)]
pub struct PathRef {
    /// Nodes in traversal order
    pub nodes: Vec<NodeRef>,
    /// Relationships in traversal order
    pub relationships: Vec<RelationshipRef>,
}

/// One decoded result row: column aliases shared across the result plus one
/// value per column
#[derive(Debug, Clone)]
pub struct ResultRow {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl ResultRow {
    /// Build a row; missing trailing values are padded with nulls, surplus
    /// values are a decode error
    pub fn new(columns: Arc<[String]>, mut values: Vec<Value>) -> Result<Self> {
        if values.len() > columns.len() {
            return Err(OgmError::decode(format!(
                "row has {} values but only {} columns",
                values.len(),
                columns.len()
            )));
        }
        values.resize(columns.len(), Value::Null);
        Ok(Self { columns, values })
    }

    /// Column aliases in projection order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Values in projection order
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Value for an alias
    pub fn get(&self, alias: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == alias)
            .map(|idx| &self.values[idx])
    }

    /// Iterate `(alias, value)` pairs in projection order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the row has no columns
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
