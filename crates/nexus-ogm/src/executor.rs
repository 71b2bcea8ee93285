//! Query executor seam
//!
//! The session hands a [`StatementRequest`] to a [`QueryExecutor`] and gets a
//! [`RawResult`] back: column names, a lazy stream of wire rows and, for write
//! statements, update statistics. Transport, pooling and retries are the
//! executor's business.

use crate::error::{OgmError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use std::fmt;

/// Named statement parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters(BTreeMap<String, JsonValue>);

impl Parameters {
    /// No parameters
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter
    pub fn with(mut self, name: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Parameter value
    pub fn get(&self, name: &str) -> Option<&JsonValue> {
        self.0.get(name)
    }

    /// Iterate parameters by name
    pub fn iter(&self) -> impl Iterator<Item = (&String, &JsonValue)> {
        self.0.iter()
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no parameters
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, JsonValue>> for Parameters {
    fn from(map: Map<String, JsonValue>) -> Self {
        Self(map.into_iter().collect())
    }
}

impl<K: Into<String>, V: Into<JsonValue>> FromIterator<(K, V)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Statement handed to the executor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatementRequest {
    /// Cypher text
    pub cypher: String,
    /// Named parameters
    pub parameters: Parameters,
    /// Target database
    pub database: String,
    /// Run in a read-only transaction
    pub read_only: bool,
    /// Ask for update statistics
    pub include_stats: bool,
}

/// Update counters reported for a write statement
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryStatistics {
    /// Nodes created
    pub nodes_created: u64,
    /// Nodes deleted
    pub nodes_deleted: u64,
    /// Relationships created
    pub relationships_created: u64,
    /// Relationships deleted
    pub relationships_deleted: u64,
    /// Properties set
    pub properties_set: u64,
    /// Labels added
    pub labels_added: u64,
    /// Labels removed
    pub labels_removed: u64,
}

impl QueryStatistics {
    /// Whether any counter is non-zero
    pub fn contains_updates(&self) -> bool {
        self.nodes_created
            + self.nodes_deleted
            + self.relationships_created
            + self.relationships_deleted
            + self.properties_set
            + self.labels_added
            + self.labels_removed
            > 0
    }
}

/// Lazy stream of wire rows
pub type RowStream = Box<dyn Iterator<Item = Result<Vec<JsonValue>>> + Send>;

/// What an executor returns
pub struct RawResult {
    /// Column aliases in projection order
    pub columns: Vec<String>,
    /// Wire rows
    pub rows: RowStream,
    /// Update statistics, when requested and available
    pub statistics: Option<QueryStatistics>,
}

impl RawResult {
    /// Result over materialized rows
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<JsonValue>>) -> Self {
        Self {
            columns,
            rows: Box::new(rows.into_iter().map(Ok)),
            statistics: None,
        }
    }

    /// Attach statistics
    pub fn with_statistics(mut self, statistics: QueryStatistics) -> Self {
        self.statistics = Some(statistics);
        self
    }

    /// Parse a server response body: `{"columns": [...], "rows": [[...]],
    /// "stats": {...}}`
    pub fn from_json(body: &JsonValue) -> Result<Self> {
        let columns = match body.get("columns") {
            Some(JsonValue::Array(cols)) => cols
                .iter()
                .map(|c| {
                    c.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| OgmError::decode("column names must be strings"))
                })
                .collect::<Result<Vec<_>>>()?,
            _ => return Err(OgmError::decode("response has no 'columns' array")),
        };
        let rows = match body.get("rows") {
            Some(JsonValue::Array(rows)) => rows
                .iter()
                .map(|r| match r {
                    JsonValue::Array(values) => Ok(values.clone()),
                    other => Err(OgmError::decode(format!("row must be an array, got {}", other))),
                })
                .collect::<Result<Vec<_>>>()?,
            None | Some(JsonValue::Null) => Vec::new(),
            Some(_) => return Err(OgmError::decode("'rows' must be an array")),
        };
        let statistics = match body.get("stats") {
            Some(stats) if !stats.is_null() => Some(serde_json::from_value(stats.clone())?),
            _ => None,
        };
        let mut raw = Self::from_rows(columns, rows);
        raw.statistics = statistics;
        Ok(raw)
    }
}

impl fmt::Debug for RawResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawResult")
            .field("columns", &self.columns)
            .field("statistics", &self.statistics)
            .finish_non_exhaustive()
    }
}

/// Runs statements against a graph store
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Execute one statement
    async fn execute(&self, request: StatementRequest) -> Result<RawResult>;
}
