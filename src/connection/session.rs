use std::sync::Arc;

use async_trait::async_trait;
use neo4rs::{query, BoltType, ConfigBuilder, Graph};

use crate::error::{ViewerError, ViewerResult};
use crate::gql::query_builder::GraphQuery;
use crate::gql::query_interface::{bolt_to_json, decode_row, QueryExecutor, NODES_COLUMN, RELS_COLUMN};
use crate::graph_utils::graph::QueryRow;
use super::credentials::Credentials;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// An open driver pool bound to one database.
pub struct ConnectionHandle {
    graph: Graph,
}

impl ConnectionHandle {
    /// Build the driver and force a round trip so bad credentials fail here
    /// rather than on the first graph query.
    pub async fn open(credentials: &Credentials) -> ViewerResult<Self> {
        let config = ConfigBuilder::default()
            .uri(credentials.uri.as_str())
            .user(credentials.username.as_str())
            .password(credentials.password.as_str())
            .db(credentials.database.as_str())
            .max_connections(4)
            .fetch_size(500)
            .build()?;
        let graph = Graph::connect(config).await?;
        graph.run(query("RETURN 1")).await?;
        log::info!("connected to {} (db {})", credentials.uri, credentials.database);
        Ok(Self { graph })
    }
}

fn column(row: &neo4rs::Row, name: &str) -> ViewerResult<BoltType> {
    row.get::<BoltType>(name)
        .map_err(|e| ViewerError::Driver(format!("column {}: {}", name, e)))
}

#[async_trait]
impl QueryExecutor for ConnectionHandle {
    async fn run(&self, q: &GraphQuery) -> ViewerResult<Vec<QueryRow>> {
        let mut prepared = query(&q.text);
        for (k, v) in &q.params {
            prepared = prepared.param(k, v.clone());
        }
        let mut stream = self.graph.execute(prepared).await?;
        let mut rows = Vec::new();
        while let Some(row) = stream.next().await? {
            let nodes = bolt_to_json(column(&row, NODES_COLUMN)?);
            let rels = bolt_to_json(column(&row, RELS_COLUMN)?);
            rows.push(decode_row(nodes, rels)?);
        }
        Ok(rows)
    }
}

/// Owns the single active session. Consumers borrow the executor; only
/// `install` and `close` change which session is active.
#[derive(Default)]
pub struct SessionManager {
    executor: Option<Arc<dyn QueryExecutor>>,
    credentials: Option<Credentials>,
    status: ConnectionStatus,
}

impl SessionManager {
    pub fn new() -> Self { Self::default() }

    pub fn status(&self) -> ConnectionStatus { self.status }

    pub fn is_connected(&self) -> bool { self.status == ConnectionStatus::Connected }

    pub fn begin_connect(&mut self) {
        self.status = ConnectionStatus::Connecting;
    }

    /// Replace any previous session wholesale.
    pub fn install(&mut self, credentials: Credentials, executor: Arc<dyn QueryExecutor>) {
        self.executor = Some(executor);
        self.credentials = Some(credentials);
        self.status = ConnectionStatus::Connected;
    }

    /// Record a failed attempt. An already-installed session is dropped too.
    pub fn fail(&mut self) {
        self.close();
    }

    pub fn close(&mut self) {
        if self.executor.take().is_some() {
            log::info!("session closed");
        }
        self.credentials = None;
        self.status = ConnectionStatus::Disconnected;
    }

    pub fn executor(&self) -> ViewerResult<Arc<dyn QueryExecutor>> {
        self.executor.clone().ok_or(ViewerError::NotConnected)
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }
}
