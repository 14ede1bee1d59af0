use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use eframe::egui;

use crate::api::sources::{SourceLister, SourcesResponse};
use crate::connection::credentials::Credentials;
use crate::connection::session::ConnectionHandle;
use crate::error::ViewerResult;
use crate::gql::query_builder::GraphQuery;
use crate::gql::query_interface::{self, GraphOutcome, QueryExecutor};

/// Results delivered back to the GUI thread.
pub enum BackendEvent {
    Connected { credentials: Credentials, handle: Arc<ConnectionHandle> },
    ConnectFailed { message: String },
    Graph { ticket: u64, result: ViewerResult<GraphOutcome> },
    Sources { result: ViewerResult<SourcesResponse> },
}

/// Hands out query tickets and tells which result is still current.
/// A result whose ticket is not the latest issued is stale and dropped.
#[derive(Debug, Default, Clone)]
pub struct QueryTickets {
    latest: u64,
}

impl QueryTickets {
    pub fn issue(&mut self) -> u64 {
        self.latest += 1;
        self.latest
    }

    pub fn is_current(&self, ticket: u64) -> bool {
        ticket == self.latest
    }

    /// Invalidate everything in flight (e.g. the view was closed).
    pub fn cancel_all(&mut self) {
        self.latest += 1;
    }
}

/// Runs driver and HTTP futures on a small tokio runtime; the GUI drains
/// completed work every frame via `poll`.
pub struct Backend {
    runtime: tokio::runtime::Runtime,
    tx: Sender<BackendEvent>,
    rx: Receiver<BackendEvent>,
    tickets: QueryTickets,
    query_log_dir: Option<PathBuf>,
    repaint: Option<egui::Context>,
}

impl Backend {
    pub fn new(query_log_dir: Option<PathBuf>) -> anyhow::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()?;
        let (tx, rx) = mpsc::channel();
        Ok(Self {
            runtime,
            tx,
            rx,
            tickets: QueryTickets::default(),
            query_log_dir,
            repaint: None,
        })
    }

    /// Wake the UI whenever a result lands.
    pub fn set_repaint_context(&mut self, ctx: egui::Context) {
        self.repaint = Some(ctx);
    }

    fn sender(&self) -> (Sender<BackendEvent>, Option<egui::Context>) {
        (self.tx.clone(), self.repaint.clone())
    }

    pub fn connect(&self, credentials: Credentials) {
        let (tx, repaint) = self.sender();
        self.runtime.spawn(async move {
            let event = match ConnectionHandle::open(&credentials).await {
                Ok(handle) => BackendEvent::Connected { credentials, handle: Arc::new(handle) },
                Err(e) => {
                    log::warn!("connection to {} failed: {}", credentials.uri, e);
                    BackendEvent::ConnectFailed { message: e.to_string() }
                }
            };
            let _ = tx.send(event);
            if let Some(ctx) = repaint { ctx.request_repaint(); }
        });
    }

    /// Dispatch a graph query; returns its ticket.
    pub fn run_graph_query(&mut self, executor: Arc<dyn QueryExecutor>, query: GraphQuery) -> u64 {
        let ticket = self.tickets.issue();
        let (tx, repaint) = self.sender();
        let log_dir = self.query_log_dir.clone();
        self.runtime.spawn(async move {
            let result = query_interface::fetch_and_log(executor.as_ref(), &query, log_dir.as_deref()).await;
            let _ = tx.send(BackendEvent::Graph { ticket, result });
            if let Some(ctx) = repaint { ctx.request_repaint(); }
        });
        ticket
    }

    pub fn list_sources(&self, lister: SourceLister, credentials: Credentials) {
        let (tx, repaint) = self.sender();
        self.runtime.spawn(async move {
            let result = lister.list_sources(&credentials).await;
            let _ = tx.send(BackendEvent::Sources { result });
            if let Some(ctx) = repaint { ctx.request_repaint(); }
        });
    }

    pub fn cancel_queries(&mut self) {
        self.tickets.cancel_all();
    }

    /// Drain finished work, dropping superseded graph results.
    pub fn poll(&self) -> Vec<BackendEvent> {
        let mut out = Vec::new();
        while let Ok(ev) = self.rx.try_recv() {
            if let BackendEvent::Graph { ticket, .. } = &ev {
                if !self.tickets.is_current(*ticket) {
                    log::debug!("dropping stale graph result #{}", ticket);
                    continue;
                }
            }
            out.push(ev);
        }
        out
    }
}
