//! Testing infrastructure
//!
//! [`ScriptedExecutor`] answers statements from canned wire responses and
//! records every request it receives, so session behaviour can be exercised
//! without a running server.
//!
//! ```rust
//! use nexus_ogm::testing::ScriptedExecutor;
//! use serde_json::json;
//!
//! let executor = ScriptedExecutor::new();
//! executor.respond("RETURN 1 AS n", &["n"], vec![vec![json!(1)]]);
//! assert!(executor.requests().is_empty());
//! ```

use crate::error::{OgmError, Result};
use crate::executor::{QueryExecutor, QueryStatistics, RawResult, StatementRequest};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value as JsonValue;

enum Reply {
    Rows {
        columns: Vec<String>,
        rows: Vec<Vec<JsonValue>>,
        statistics: Option<QueryStatistics>,
    },
    Body(JsonValue),
    Failure(String),
}

struct Script {
    cypher: String,
    reply: Reply,
}

/// Executor replaying scripted responses keyed by statement text
#[derive(Default)]
pub struct ScriptedExecutor {
    scripts: Mutex<Vec<Script>>,
    requests: Mutex<Vec<StatementRequest>>,
}

/// Collapse whitespace so scripts match regardless of formatting
fn normalize(cypher: &str) -> String {
    cypher.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl ScriptedExecutor {
    /// Executor with no scripts
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, cypher: &str, reply: Reply) {
        self.scripts.lock().push(Script {
            cypher: normalize(cypher),
            reply,
        });
    }

    /// Answer `cypher` with rows
    pub fn respond(&self, cypher: &str, columns: &[&str], rows: Vec<Vec<JsonValue>>) {
        self.push(
            cypher,
            Reply::Rows {
                columns: columns.iter().map(|c| c.to_string()).collect(),
                rows,
                statistics: None,
            },
        );
    }

    /// Answer `cypher` with rows and update counters
    pub fn respond_with_statistics(
        &self,
        cypher: &str,
        columns: &[&str],
        rows: Vec<Vec<JsonValue>>,
        statistics: QueryStatistics,
    ) {
        self.push(
            cypher,
            Reply::Rows {
                columns: columns.iter().map(|c| c.to_string()).collect(),
                rows,
                statistics: Some(statistics),
            },
        );
    }

    /// Answer `cypher` with a raw server response body
    pub fn respond_json(&self, cypher: &str, body: JsonValue) {
        self.push(cypher, Reply::Body(body));
    }

    /// Fail `cypher` with an executor error
    pub fn fail(&self, cypher: &str, message: &str) {
        self.push(cypher, Reply::Failure(message.to_string()));
    }

    /// Requests received so far, in order
    pub fn requests(&self) -> Vec<StatementRequest> {
        self.requests.lock().clone()
    }

    /// Most recent request
    pub fn last_request(&self) -> Option<StatementRequest> {
        self.requests.lock().last().cloned()
    }
}

#[async_trait]
impl QueryExecutor for ScriptedExecutor {
    async fn execute(&self, request: StatementRequest) -> Result<RawResult> {
        let key = normalize(&request.cypher);
        self.requests.lock().push(request);

        let scripts = self.scripts.lock();
        let script = scripts
            .iter()
            .find(|s| s.cypher == key)
            .ok_or_else(|| OgmError::executor(format!("no scripted response for: {}", key)))?;

        match &script.reply {
            Reply::Rows {
                columns,
                rows,
                statistics,
            } => {
                let mut raw = RawResult::from_rows(columns.clone(), rows.clone());
                raw.statistics = *statistics;
                Ok(raw)
            }
            Reply::Body(body) => RawResult::from_json(body),
            Reply::Failure(message) => {
                Err(anyhow::anyhow!("scripted failure: {}", message).into())
            }
        }
    }
}

impl std::fmt::Debug for ScriptedExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedExecutor")
            .field("scripts", &self.scripts.lock().len())
            .field("requests", &self.requests.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::Parameters;
    use serde_json::json;

    fn request(cypher: &str) -> StatementRequest {
        StatementRequest {
            cypher: cypher.to_string(),
            parameters: Parameters::new(),
            database: "neo4j".to_string(),
            read_only: true,
            include_stats: false,
        }
    }

    #[tokio::test]
    async fn test_matches_ignoring_whitespace() {
        let executor = ScriptedExecutor::new();
        executor.respond("MATCH (n)\n  RETURN n", &["n"], vec![vec![json!(1)]]);
        let raw = executor.execute(request("MATCH (n) RETURN n")).await.unwrap();
        assert_eq!(raw.columns, vec!["n".to_string()]);
        assert_eq!(executor.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_failure_and_missing_script() {
        let executor = ScriptedExecutor::new();
        executor.fail("RETURN 1", "connection reset");
        let err = executor.execute(request("RETURN 1")).await.unwrap_err();
        assert!(err.to_string().contains("connection reset"));
        let err = executor.execute(request("RETURN 2")).await.unwrap_err();
        assert!(matches!(err, OgmError::Executor(_)));
        assert_eq!(executor.last_request().unwrap().cypher, "RETURN 2");
    }

    #[tokio::test]
    async fn test_json_body() {
        let executor = ScriptedExecutor::new();
        executor.respond_json(
            "CREATE (n)",
            json!({"columns": [], "rows": [], "stats": {"nodes_created": 1}}),
        );
        let raw = executor.execute(request("CREATE (n)")).await.unwrap();
        assert_eq!(raw.statistics.unwrap().nodes_created, 1);
    }
}
