use std::sync::Arc;
use std::time::Instant;

use eframe::egui::{self, Color32};

use crate::api::sources::{SourceLister, SourceNode};
use crate::connection::session::{ConnectionStatus, SessionManager};
use crate::gql::query_interface::QueryExecutor;
use crate::persistence::settings::{AppSettings, SettingsStore};
use super::backend::{Backend, BackendEvent};
use super::banner::{Banner, BannerKind};
use super::connection_dialog::{ConnectionDialog, DialogAction};
use super::graph_view::{GraphView, ViewPoint};

pub struct GraphApp {
    store: SettingsStore,
    settings: AppSettings,
    backend: Backend,
    session: SessionManager,
    connection: ConnectionDialog,
    // Sources side panel
    sources: Vec<SourceNode>,
    sources_loading: bool,
    sources_banner: Banner,
    graph_view: Option<GraphView>,
}

impl GraphApp {
    pub fn new(store: SettingsStore, settings: AppSettings, backend: Backend) -> Self {
        let mut connection = ConnectionDialog::new(&settings);
        // nothing to show until a session exists
        connection.open = true;
        Self {
            store,
            settings,
            backend,
            session: SessionManager::new(),
            connection,
            sources: Vec::new(),
            sources_loading: false,
            sources_banner: Banner::default(),
            graph_view: None,
        }
    }

    fn submit_connection(&mut self) {
        match self.connection.submit(&mut self.settings, &self.store) {
            Ok(credentials) => {
                log::info!("connecting to {}", credentials.uri);
                self.session.begin_connect();
                self.backend.connect(credentials);
            }
            Err(e) => self.connection.on_failed(&e.to_string(), Instant::now()),
        }
    }

    pub fn disconnect(&mut self) {
        self.backend.cancel_queries();
        self.graph_view = None;
        self.sources.clear();
        self.session.close();
        self.connection.open = true;
    }

    fn refresh_sources(&mut self) {
        let Some(credentials) = self.session.credentials().cloned() else { return };
        self.sources_loading = true;
        self.backend.list_sources(SourceLister::new(&self.settings.backend_url), credentials);
    }

    pub fn open_view(&mut self, view_point: ViewPoint) {
        self.backend.cancel_queries();
        self.graph_view = Some(GraphView::open(view_point, Instant::now()));
    }

    pub fn close_view(&mut self) {
        // in-flight results for the closed view are discarded
        self.backend.cancel_queries();
        self.graph_view = None;
    }

    /// Dispatch the open view's query if its facets or limit changed.
    fn dispatch_pending_query(&mut self) {
        let Some(view) = self.graph_view.as_mut() else { return };
        let Some(query) = view.take_pending_query() else { return };
        match self.session.executor() {
            Ok(executor) => {
                self.backend.run_graph_query(executor, query);
            }
            Err(e) => view.fail(e.to_string()),
        }
    }

    pub fn handle_event(&mut self, event: BackendEvent, now: Instant) {
        match event {
            BackendEvent::Connected { credentials, handle } => {
                self.session.install(credentials, handle as Arc<dyn QueryExecutor>);
                self.connection.on_connected();
                self.refresh_sources();
            }
            BackendEvent::ConnectFailed { message } => {
                self.session.fail();
                self.connection.on_failed(&message, now);
            }
            BackendEvent::Graph { result, .. } => {
                if let Some(view) = self.graph_view.as_mut() {
                    view.apply_result(result);
                }
            }
            BackendEvent::Sources { result } => {
                self.sources_loading = false;
                match result {
                    Ok(resp) if resp.is_success() => {
                        self.sources = resp.data;
                        self.sources_banner.dismiss();
                    }
                    Ok(resp) => {
                        let msg = resp.error.or(resp.message).unwrap_or_else(|| "Failed to list sources".into());
                        self.sources_banner.show(BannerKind::Danger, msg);
                    }
                    Err(e) => {
                        log::warn!("sources_list failed: {}", e);
                        self.sources_banner.show(BannerKind::Danger, e.to_string());
                    }
                }
            }
        }
    }

    fn top_bar_ui(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.strong("KG-Viewer");
                ui.separator();
                match self.session.status() {
                    ConnectionStatus::Connected => {
                        let uri = self.session.credentials().map(|c| c.uri.clone()).unwrap_or_default();
                        ui.colored_label(Color32::LIGHT_GREEN, format!("Connected: {}", uri));
                        if ui.button("Disconnect").clicked() {
                            self.disconnect();
                        }
                        if ui.button("Preview Graph").clicked() {
                            self.open_view(ViewPoint::Graph);
                        }
                    }
                    ConnectionStatus::Connecting => {
                        ui.spinner();
                        ui.label("Connecting...");
                    }
                    ConnectionStatus::Disconnected => {
                        ui.colored_label(Color32::GRAY, "Not connected");
                        if ui.button("Connect").clicked() {
                            self.connection.open = true;
                        }
                    }
                }
            });
        });
    }

    fn sources_ui(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("sources").resizable(true).default_width(280.0).show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Sources");
                let enabled = self.session.is_connected() && !self.sources_loading;
                if ui.add_enabled(enabled, egui::Button::new("Refresh")).clicked() {
                    self.refresh_sources();
                }
                if self.sources_loading {
                    ui.spinner();
                }
            });
            ui.separator();
            if self.sources_banner.is_visible() {
                ui.horizontal(|ui| {
                    ui.colored_label(Color32::from_rgb(230, 90, 90), self.sources_banner.message());
                    if ui.small_button("x").clicked() {
                        self.sources_banner.dismiss();
                    }
                });
            }
            let mut inspect: Option<String> = None;
            egui::ScrollArea::vertical().show(ui, |ui| {
                for src in &self.sources {
                    ui.horizontal(|ui| {
                        if ui.link(src.file_name.as_str()).on_hover_text("Inspect generated graph").clicked() {
                            inspect = Some(src.file_name.clone());
                        }
                        if let Some(status) = &src.status {
                            ui.small(status.as_str());
                        }
                    });
                }
            });
            if let Some(document) = inspect {
                self.open_view(ViewPoint::Table { document });
            }
        });
    }
}

impl eframe::App for GraphApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        self.backend.set_repaint_context(ctx.clone());
        for event in self.backend.poll() {
            self.handle_event(event, now);
        }
        self.connection.tick(now);
        if let Some(t) = self.connection.banner.expires_at() {
            ctx.request_repaint_after(t.saturating_duration_since(now));
        }

        self.top_bar_ui(ctx);
        self.sources_ui(ctx);
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.centered_and_justified(|ui| {
                if self.session.is_connected() {
                    ui.label("Pick a source to inspect, or preview the whole graph.");
                } else {
                    ui.label("Connect to a Neo4j database to begin.");
                }
            });
        });

        match self.connection.ui(ctx) {
            DialogAction::Submit => self.submit_connection(),
            DialogAction::Cancel => self.connection.open = false,
            DialogAction::None => {}
        }

        if let Some(view) = self.graph_view.as_mut() {
            if view.ui(ctx).close {
                self.close_view();
            }
        }
        self.dispatch_pending_query();
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.session.close();
    }
}
