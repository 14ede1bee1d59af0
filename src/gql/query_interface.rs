use async_trait::async_trait;
use neo4rs::BoltType;
use serde_json::{Map, Number, Value};
use std::fs::{create_dir_all, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use time::{macros::format_description, OffsetDateTime};

use crate::error::{ViewerError, ViewerResult};
use crate::graph_utils::assemble::{self, ColorScheme};
use crate::graph_utils::graph::{GraphNode, GraphRelationship, QueryRow, VisualGraph};
use super::query_builder::GraphQuery;

/// Column names produced by the graph query templates.
pub const NODES_COLUMN: &str = "nodes";
pub const RELS_COLUMN: &str = "rels";

/// Anything that can run a parametrized graph query and hand back its rows.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn run(&self, query: &GraphQuery) -> ViewerResult<Vec<QueryRow>>;
}

/// Assembled result of one graph query.
#[derive(Debug, Clone, Default)]
pub struct GraphOutcome {
    pub graph: VisualGraph,
    pub scheme: ColorScheme,
    pub rows: usize,
}

fn log_path_for_now(dir: &Path) -> PathBuf {
    let now = OffsetDateTime::now_utc();
    let fmt = format_description!("[year][month][day]");
    let date = now.format(&fmt).unwrap_or_else(|_| "unknown".into());
    dir.join(format!("queries_{}.log", date))
}

/// Append the query and its outcome to the dated query log in `dir`.
pub fn log_query(dir: &Path, query: &GraphQuery, outcome: &ViewerResult<GraphOutcome>) {
    if let Err(e) = create_dir_all(dir) {
        log::warn!("query log dir {} unavailable: {}", dir.display(), e);
        return;
    }
    let path = log_path_for_now(dir);
    let now = OffsetDateTime::now_utc();
    let ts_fmt = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let ts = now.format(&ts_fmt).unwrap_or_else(|_| "".into());
    let status = match outcome {
        Ok(o) => format!(
            "OK rows={} nodes={} rels={}",
            o.rows,
            o.graph.node_count(),
            o.graph.relationship_count()
        ),
        Err(e) => format!("ERR {}", e),
    };
    let mut params: Vec<_> = query.params.iter().map(|(k, v)| format!("{}={:?}", k, v)).collect();
    params.sort();
    let line = format!("{} | {} | {}\n{}\n\n", ts, status, params.join(","), query.text.trim());
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&path) {
        let _ = file.write_all(line.as_bytes());
    }
}

/// Run `query`, then reshape its rows for the renderer.
pub async fn fetch_graph(executor: &dyn QueryExecutor, query: &GraphQuery) -> ViewerResult<GraphOutcome> {
    let rows = executor.run(query).await?;
    let count = rows.len();
    let (graph, scheme) = assemble::assemble(rows)?;
    log::debug!(
        "assembled {} nodes / {} rels from {} row(s)",
        graph.node_count(),
        graph.relationship_count(),
        count
    );
    Ok(GraphOutcome { graph, scheme, rows: count })
}

/// `fetch_graph` plus an entry in the query log when `log_dir` is set.
pub async fn fetch_and_log(
    executor: &dyn QueryExecutor,
    query: &GraphQuery,
    log_dir: Option<&Path>,
) -> ViewerResult<GraphOutcome> {
    let res = fetch_graph(executor, query).await;
    if let Some(dir) = log_dir {
        log_query(dir, query, &res);
    }
    res
}

/// Convert a driver value into plain JSON. Temporal and spatial values have
/// no JSON counterpart here and become null.
pub fn bolt_to_json(value: BoltType) -> Value {
    match value {
        BoltType::Null(_) => Value::Null,
        BoltType::Boolean(b) => Value::Bool(b.value),
        BoltType::Integer(i) => Value::Number(i.value.into()),
        BoltType::Float(f) => Number::from_f64(f.value).map(Value::Number).unwrap_or(Value::Null),
        BoltType::String(s) => Value::String(s.value),
        BoltType::List(l) => Value::Array(l.value.into_iter().map(bolt_to_json).collect()),
        BoltType::Map(m) => {
            let mut out = Map::new();
            for (k, v) in m.value {
                out.insert(k.value, bolt_to_json(v));
            }
            Value::Object(out)
        }
        _ => Value::Null,
    }
}

/// Decode the projected `nodes`/`rels` columns of one record.
pub fn decode_row(nodes: Value, rels: Value) -> ViewerResult<QueryRow> {
    let nodes: Vec<GraphNode> = match nodes {
        Value::Null => Vec::new(),
        v => serde_json::from_value(v)?,
    };
    let relationships: Vec<GraphRelationship> = match rels {
        Value::Null => Vec::new(),
        v => serde_json::from_value(v)?,
    };
    Ok(QueryRow { nodes, relationships })
}

/// Executor over canned rows; used for offline previews and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticExecutor {
    pub rows: Vec<QueryRow>,
    pub fail_with: Option<String>,
}

#[async_trait]
impl QueryExecutor for StaticExecutor {
    async fn run(&self, _query: &GraphQuery) -> ViewerResult<Vec<QueryRow>> {
        if let Some(msg) = &self.fail_with {
            return Err(ViewerError::Driver(msg.clone()));
        }
        Ok(self.rows.clone())
    }
}
