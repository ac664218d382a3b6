//! The `GraphStore` port (§6, "Graph store interface") and its `neo4rs`
//! adapter.
//!
//! The loader and schema/dedup/orphan/integrity components only depend on
//! this trait, never on `neo4rs` directly, so the glossary-driven loading
//! logic stays testable against an in-memory fake.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use crate::error::{GraphError, Result};

/// One parameterized Cypher-like statement.
#[derive(Debug, Clone)]
pub struct Statement {
    pub cypher: String,
    pub params: BTreeMap<String, Value>,
}

impl Statement {
    pub fn new(cypher: impl Into<String>) -> Self {
        Self {
            cypher: cypher.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// A single returned row, keyed by the statement's `RETURN` aliases.
pub type Row = BTreeMap<String, Value>;

/// Required operations a graph backend must support (§6): database
/// lifecycle, transactional execution of Cypher-like statement batches,
/// constraint/index creation, and read queries. The loader never depends on
/// anything outside this surface except to probe optional fast paths.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Create the named database if it does not already exist. Returns
    /// `Ok(true)` if multi-database creation is supported and succeeded,
    /// `Ok(false)` if the backend does not support multiple databases (the
    /// caller falls back to a shared default database).
    async fn create_database(&self, name: &str) -> Result<bool>;

    /// Poll until `name` reports online, or the timeout elapses.
    async fn wait_online(&self, name: &str, timeout: Duration) -> Result<()>;

    /// Execute `statements` as a single transaction against `database`.
    /// Implementations MUST NOT allow a schema statement (constraint/index)
    /// and a data statement (`MERGE`/`SET`/`DELETE`) in the same call;
    /// callers are responsible for separating them (§4.4.2/§4.4.3).
    async fn run_transaction(&self, database: &str, statements: Vec<Statement>) -> Result<()>;

    /// Execute a single read statement and collect its rows.
    async fn query(&self, database: &str, statement: Statement) -> Result<Vec<Row>>;
}

/// `neo4rs`-backed [`GraphStore`].
///
/// Bolt sessions are scoped per logical database name and cached in a
/// `DashMap`, following the teacher's convention of keeping shared mutable
/// caches behind a concurrent map rather than a mutex-guarded struct field.
pub struct Neo4rsGraphStore {
    uri: String,
    user: String,
    password: String,
    sessions: DashMap<String, Arc<neo4rs::Graph>>,
}

impl Neo4rsGraphStore {
    pub fn new(uri: impl Into<String>, user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            user: user.into(),
            password: password.into(),
            sessions: DashMap::new(),
        }
    }

    async fn session(&self, database: &str) -> Result<Arc<neo4rs::Graph>> {
        if let Some(existing) = self.sessions.get(database) {
            return Ok(Arc::clone(existing.value()));
        }
        let config = neo4rs::ConfigBuilder::default()
            .uri(&self.uri)
            .user(&self.user)
            .password(&self.password)
            .db(database)
            .build()
            .map_err(|e| GraphError::backend(format!("invalid neo4j config: {e}")))?;
        let graph = Arc::new(neo4rs::Graph::connect(config).await?);
        self.sessions.insert(database.to_string(), Arc::clone(&graph));
        Ok(graph)
    }

    async fn system_session(&self) -> Result<Arc<neo4rs::Graph>> {
        self.session("system").await
    }

    fn to_query(statement: &Statement) -> neo4rs::Query {
        let mut query = neo4rs::query(&statement.cypher);
        for (key, value) in &statement.params {
            query = query.param(key, value.clone());
        }
        query
    }
}

#[async_trait]
impl GraphStore for Neo4rsGraphStore {
    async fn create_database(&self, name: &str) -> Result<bool> {
        let system = self.system_session().await?;
        let query = neo4rs::query(&format!("CREATE DATABASE `{name}` IF NOT EXISTS"));
        match system.run(query).await {
            Ok(()) => Ok(true),
            // Community-edition backends reject multi-database administration;
            // the caller falls back to a shared default database (§4.4.1).
            Err(e) => {
                tracing::warn!(database = name, error = %e, "multi-database creation unsupported, falling back");
                Ok(false)
            }
        }
    }

    async fn wait_online(&self, name: &str, timeout: Duration) -> Result<()> {
        let system = self.system_session().await?;
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let query = neo4rs::query("SHOW DATABASE $name YIELD currentStatus")
                .param("name", name);
            let mut stream = system.execute(query).await?;
            if let Some(row) = stream.next().await? {
                let status: String = row.get("currentStatus").unwrap_or_default();
                if status == "online" {
                    return Ok(());
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(GraphError::backend(format!(
                    "database {name} did not come online within {timeout:?}"
                )));
            }
            tokio::time::sleep(Duration::from_millis(250)).await;
        }
    }

    async fn run_transaction(&self, database: &str, statements: Vec<Statement>) -> Result<()> {
        let graph = self.session(database).await?;
        let mut txn = graph.start_txn().await?;
        for statement in &statements {
            txn.run(Self::to_query(statement)).await?;
        }
        txn.commit().await?;
        Ok(())
    }

    async fn query(&self, database: &str, statement: Statement) -> Result<Vec<Row>> {
        let graph = self.session(database).await?;
        let mut stream = graph.execute(Self::to_query(&statement)).await?;
        let mut rows = Vec::new();
        while let Some(row) = stream.next().await? {
            let mut out = Row::new();
            for key in row.keys() {
                if let Ok(value) = row.get::<Value>(key) {
                    out.insert(key.to_string(), value);
                }
            }
            rows.push(out);
        }
        Ok(rows)
    }
}
