//! Sessions: statement submission and result hydration
//!
//! A [`SessionFactory`] owns the mapping metadata, the executor and the
//! configuration; sessions opened from it share all three. Sessions hold no
//! per-query state, so one session may run any number of queries, each with
//! its own identity scope.

use crate::cardinality::Cardinality;
use crate::classify;
use crate::coerce::FromMapped;
use crate::config::OgmConfig;
use crate::domain::DomainClass;
use crate::error::{OgmError, Result};
use crate::executor::{Parameters, QueryExecutor, RawResult, StatementRequest};
use crate::metadata::{ClassKind, MetaData};
use crate::result::{Mapped, QueryResult};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Logged when a write-looking statement is run read-only on request
pub const READ_ONLY_WRITE_WARNING: &str = "Cypher query contains keywords that indicate a writing query but OGM is going to use a read only transaction as requested, so the query might fail.";

/// Session ID type
pub type SessionId = String;

/// Creates sessions over shared metadata and executor
#[derive(Clone)]
pub struct SessionFactory {
    metadata: Arc<MetaData>,
    executor: Arc<dyn QueryExecutor>,
    config: Arc<OgmConfig>,
    next_id: Arc<AtomicU64>,
}

impl SessionFactory {
    /// Create a factory with default configuration
    pub fn new(metadata: MetaData, executor: Arc<dyn QueryExecutor>) -> Self {
        Self::with_config(metadata, executor, OgmConfig::default())
    }

    /// Create a factory with explicit configuration
    pub fn with_config(
        metadata: MetaData,
        executor: Arc<dyn QueryExecutor>,
        config: OgmConfig,
    ) -> Self {
        Self {
            metadata: Arc::new(metadata),
            executor,
            config: Arc::new(config),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Open a session
    pub fn open_session(&self) -> Session {
        let id = format!("session-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        debug!("Opening {} on database {}", id, self.config.database);
        Session {
            id,
            metadata: Arc::clone(&self.metadata),
            executor: Arc::clone(&self.executor),
            config: Arc::clone(&self.config),
        }
    }

    /// Mapping metadata
    pub fn metadata(&self) -> &MetaData {
        &self.metadata
    }

    /// Configuration
    pub fn config(&self) -> &OgmConfig {
        &self.config
    }
}

impl std::fmt::Debug for SessionFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionFactory")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Unit of work against the store
#[derive(Clone)]
pub struct Session {
    id: SessionId,
    metadata: Arc<MetaData>,
    executor: Arc<dyn QueryExecutor>,
    config: Arc<OgmConfig>,
}

impl Session {
    /// Session ID
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Run a statement and hydrate rows into column maps; read-only unless
    /// the statement looks like a write
    pub async fn query(&self, cypher: &str, parameters: Parameters) -> Result<QueryResult> {
        self.run_rows(cypher, parameters, None).await
    }

    /// Run a statement with an explicit read-only flag
    pub async fn query_with(
        &self,
        cypher: &str,
        parameters: Parameters,
        read_only: bool,
    ) -> Result<QueryResult> {
        self.run_rows(cypher, parameters, Some(read_only)).await
    }

    /// Run a statement and map its results to `T`
    pub async fn query_for<T: FromMapped>(
        &self,
        cypher: &str,
        parameters: Parameters,
    ) -> Result<Mapped<T>> {
        self.run_mapped(cypher, parameters, None).await
    }

    /// Run a statement with an explicit read-only flag and map its results
    pub async fn query_for_with<T: FromMapped>(
        &self,
        cypher: &str,
        parameters: Parameters,
        read_only: bool,
    ) -> Result<Mapped<T>> {
        self.run_mapped(cypher, parameters, Some(read_only)).await
    }

    /// Run a statement expected to yield at most one `T`
    pub async fn query_for_object<T: FromMapped>(
        &self,
        cypher: &str,
        parameters: Parameters,
    ) -> Result<Option<T>> {
        let mapped = self.query_for::<T>(cypher, parameters).await?;
        Cardinality::AtMostOne.single(mapped)
    }

    /// Load instances of a registered class by store identity
    pub async fn load_all<T: DomainClass + FromMapped>(&self, ids: &[u64]) -> Result<Vec<T>> {
        let class = self
            .metadata
            .class(T::CLASS)
            .ok_or_else(|| OgmError::UnknownClass(T::CLASS.to_string()))?;

        let cypher = match class.kind() {
            ClassKind::Node => {
                let labels: String = class
                    .labels()
                    .iter()
                    .map(|l| format!(":`{}`", l.replace('`', "``")))
                    .collect();
                format!("MATCH (n{}) WHERE id(n) IN $ids RETURN n", labels)
            }
            ClassKind::Relationship { rel_type, .. } => format!(
                "MATCH (s)-[r:`{}`]->(e) WHERE id(r) IN $ids RETURN s, r, e",
                rel_type.replace('`', "``")
            ),
        };

        let parameters = Parameters::new().with("ids", json!(ids));
        self.query_for_with::<T>(&cypher, parameters, true)
            .await?
            .collect()
    }

    /// Delete every node and relationship in the database
    pub async fn purge_database(&self) -> Result<()> {
        let result = self
            .query_with("MATCH (n) DETACH DELETE n", Parameters::new(), false)
            .await?;
        for row in result {
            row?;
        }
        Ok(())
    }

    async fn run_rows(
        &self,
        cypher: &str,
        parameters: Parameters,
        read_only: Option<bool>,
    ) -> Result<QueryResult> {
        let (raw, with_statistics) = self.submit(cypher, parameters, read_only).await?;
        Ok(QueryResult::new(
            raw,
            Arc::clone(&self.metadata),
            with_statistics,
        ))
    }

    async fn run_mapped<T: FromMapped>(
        &self,
        cypher: &str,
        parameters: Parameters,
        read_only: Option<bool>,
    ) -> Result<Mapped<T>> {
        let (raw, with_statistics) = self.submit(cypher, parameters, read_only).await?;
        Ok(Mapped::new(
            raw,
            Arc::clone(&self.metadata),
            with_statistics,
        ))
    }

    fn resolve_read_only(&self, cypher: &str, requested: Option<bool>) -> bool {
        let write = classify::is_write(cypher);
        match requested {
            None => !write,
            Some(true) => {
                if write && self.config.warn_on_read_only_writes {
                    warn!("{}", READ_ONLY_WRITE_WARNING);
                }
                true
            }
            Some(false) => false,
        }
    }

    async fn submit(
        &self,
        cypher: &str,
        parameters: Parameters,
        read_only: Option<bool>,
    ) -> Result<(RawResult, bool)> {
        let read_only = self.resolve_read_only(cypher, read_only);
        let include_stats = !read_only && self.config.include_statistics;
        debug!(
            "{} executing {} statement: {}",
            self.id,
            if read_only { "read-only" } else { "write" },
            cypher
        );

        let request = StatementRequest {
            cypher: cypher.to_string(),
            parameters,
            database: self.config.database.clone(),
            read_only,
            include_stats,
        };
        let raw = self.executor.execute(request).await?;
        debug!("{} received columns {:?}", self.id, raw.columns);
        Ok((raw, include_stats))
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("database", &self.config.database)
            .finish_non_exhaustive()
    }
}
