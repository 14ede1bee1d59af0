use std::time::{Duration, Instant};

use eframe::egui::{self, Color32, Rect, Sense, Stroke, Vec2};

use crate::error::ViewerResult;
use crate::gql::query_builder::{
    build_query, FacetSet, GraphQuery, GraphType, ViewMode, DEFAULT_DOC_LIMIT, DOC_LIMIT_CHOICES,
};
use crate::gql::query_interface::GraphOutcome;
use crate::graph_utils::assemble::ColorScheme;
use crate::graph_utils::graph::{CaptionAlign, ElementId, VisualGraph};
use super::banner::{Banner, BannerKind};
use super::layout::{ForceLayout, STEP_DT};
use super::viewport::{AutoFit, Viewport};

/// Where the view was opened from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewPoint {
    /// Inspecting one document picked from the sources list
    Table { document: String },
    /// Whole-graph preview over the latest documents
    Graph,
}

/// User intent coming out of the view's controls.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct ViewAction {
    pub close: bool,
}

/// The graph preview window: facet selection, query state, and the canvas.
pub struct GraphView {
    pub view_point: ViewPoint,
    facets: FacetSet,
    doc_limit: u32,
    graph: VisualGraph,
    scheme: ColorScheme,
    layout: Option<ForceLayout>,
    viewport: Viewport,
    auto_fit: AutoFit,
    loading: bool,
    banner: Banner,
    needs_query: bool,
    selected: Vec<ElementId>,
    dragging: Option<ElementId>,
    last_canvas: Option<Rect>,
    pending_fit: bool,
}

impl GraphView {
    pub fn open(view_point: ViewPoint, now: Instant) -> Self {
        Self {
            view_point,
            facets: FacetSet::default(),
            doc_limit: DEFAULT_DOC_LIMIT,
            graph: VisualGraph::default(),
            scheme: ColorScheme::new(),
            layout: None,
            viewport: Viewport::default(),
            auto_fit: AutoFit::new(now),
            loading: false,
            banner: Banner::default(),
            needs_query: true,
            selected: Vec::new(),
            dragging: None,
            last_canvas: None,
            pending_fit: false,
        }
    }

    pub fn title(&self) -> String {
        match &self.view_point {
            ViewPoint::Table { document } => format!("Inspect Generated Graph from {}", document),
            ViewPoint::Graph => "Generated Graph".to_string(),
        }
    }

    /// Facets offered as checkboxes; chunk chains only make sense in the whole-graph view.
    pub fn available_facets(&self) -> &'static [GraphType] {
        match self.view_point {
            ViewPoint::Table { .. } => &[GraphType::Document, GraphType::Entities],
            ViewPoint::Graph => &GraphType::ALL,
        }
    }

    pub fn facets(&self) -> &FacetSet { &self.facets }
    pub fn doc_limit(&self) -> u32 { self.doc_limit }
    pub fn graph(&self) -> &VisualGraph { &self.graph }
    pub fn scheme(&self) -> &ColorScheme { &self.scheme }
    pub fn is_loading(&self) -> bool { self.loading }
    pub fn banner(&self) -> &Banner { &self.banner }
    pub fn viewport(&self) -> &Viewport { &self.viewport }

    pub fn toggle_facet(&mut self, facet: GraphType) -> bool {
        let changed = self.facets.toggle(facet);
        if changed {
            self.needs_query = true;
        }
        changed
    }

    pub fn set_doc_limit(&mut self, limit: u32) {
        if limit != self.doc_limit {
            self.doc_limit = limit.max(1);
            self.needs_query = true;
        }
    }

    pub fn mode(&self) -> ViewMode {
        match self.view_point {
            ViewPoint::Table { .. } => ViewMode::Table,
            ViewPoint::Graph => ViewMode::graph(self.doc_limit),
        }
    }

    pub fn query(&self) -> GraphQuery {
        let name = match &self.view_point {
            ViewPoint::Table { document } => document.as_str(),
            ViewPoint::Graph => "",
        };
        build_query(&self.facets, self.mode(), name)
    }

    /// If a (re)query is due, clear the canvas, enter loading state and return the query.
    pub fn take_pending_query(&mut self) -> Option<GraphQuery> {
        if !self.needs_query {
            return None;
        }
        self.needs_query = false;
        self.graph = VisualGraph::default();
        self.layout = None;
        self.selected.clear();
        self.loading = true;
        Some(self.query())
    }

    pub fn apply_result(&mut self, result: ViewerResult<GraphOutcome>) {
        self.loading = false;
        match result {
            Ok(outcome) => {
                let dangling = outcome.graph.dangling_relationships().len();
                if dangling > 0 {
                    log::warn!("{} relationship(s) reference nodes outside the result", dangling);
                }
                self.layout = Some(ForceLayout::new(&outcome.graph));
                self.graph = outcome.graph;
                self.scheme = outcome.scheme;
                self.banner.dismiss();
            }
            Err(e) => {
                log::error!("graph query failed: {}", e);
                self.banner.show(BannerKind::Danger, e.to_string());
            }
        }
    }

    /// Report a failure that happened before dispatch (e.g. no session).
    pub fn fail(&mut self, message: impl Into<String>) {
        self.loading = false;
        self.banner.show(BannerKind::Danger, message);
    }

    pub fn selection(&self) -> &[ElementId] { &self.selected }

    /// Click on a node. With single selection the click replaces the
    /// selection, otherwise it toggles the node in or out.
    pub fn select(&mut self, id: ElementId) {
        if self.viewport.options.single_selection {
            self.selected.clear();
            self.selected.push(id);
        } else if let Some(i) = self.selected.iter().position(|s| *s == id) {
            self.selected.remove(i);
        } else {
            self.selected.push(id);
        }
    }

    pub fn zoom_in(&mut self) { self.viewport.zoom_in(); }
    pub fn zoom_out(&mut self) { self.viewport.zoom_out(); }

    /// Fit the viewport to every current node.
    pub fn zoom_to_fit(&mut self) {
        let Some(canvas) = self.last_canvas else {
            self.pending_fit = true;
            return;
        };
        if let Some(layout) = &self.layout {
            let bounds = layout.bounds(self.graph.nodes.iter().map(|n| n.id.as_str()));
            self.viewport.fit(canvas, bounds);
        }
    }

    pub fn ui(&mut self, ctx: &egui::Context) -> ViewAction {
        let mut open = true;
        let mut action = ViewAction::default();
        egui::Window::new(self.title())
            .id(egui::Id::new("graph_view"))
            .open(&mut open)
            .collapsible(false)
            .resizable(true)
            .default_size([1100.0, 720.0])
            .show(ctx, |ui| {
                self.controls_ui(ui);
                ui.separator();
                if self.loading {
                    ui.centered_and_justified(|ui| { ui.spinner(); });
                } else if self.banner.is_visible() {
                    ui.horizontal(|ui| {
                        ui.colored_label(Color32::from_rgb(230, 90, 90), self.banner.message());
                        if ui.small_button("x").clicked() {
                            self.banner.dismiss();
                        }
                    });
                } else {
                    self.canvas_ui(ui);
                }
            });
        if !open {
            action.close = true;
        }
        action
    }

    fn controls_ui(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            for &facet in self.available_facets() {
                let mut checked = self.facets.contains(facet);
                let locked = self.facets.is_locked(facet);
                if ui.add_enabled(!locked, egui::Checkbox::new(&mut checked, facet.label())).changed() {
                    self.toggle_facet(facet);
                }
            }
            if matches!(self.view_point, ViewPoint::Graph) {
                ui.separator();
                let mut limit = self.doc_limit;
                egui::ComboBox::from_label("Documents")
                    .selected_text(limit.to_string())
                    .show_ui(ui, |ui| {
                        for choice in DOC_LIMIT_CHOICES {
                            ui.selectable_value(&mut limit, choice, choice.to_string());
                        }
                    });
                self.set_doc_limit(limit);
            }
            // legend
            ui.separator();
            for (label, color) in self.scheme.entries() {
                let col = parse_hex_color(color).unwrap_or(Color32::GRAY);
                let name = if label.is_empty() { "(none)" } else { label };
                ui.colored_label(col, format!("● {}", name));
            }
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("Fit").on_hover_text("Zoom to fit").clicked() {
                    self.zoom_to_fit();
                }
                if ui.button("-").on_hover_text("Zoom out").clicked() {
                    self.zoom_out();
                }
                if ui.button("+").on_hover_text("Zoom in").clicked() {
                    self.zoom_in();
                }
                ui.small(format!("{:.2}x", self.viewport.zoom));
            });
        });
    }

    fn canvas_ui(&mut self, ui: &mut egui::Ui) {
        let available = ui.available_rect_before_wrap();
        self.last_canvas = Some(available);
        let bg_resp = ui.allocate_rect(available, Sense::click_and_drag());
        let painter = ui.painter_at(available);
        painter.rect_filled(available, 4.0, Color32::from_gray(24));

        let now = Instant::now();
        let mut finished = false;
        if let Some(layout) = self.layout.as_mut() {
            if layout.is_computing() {
                // a few fixed steps per frame keeps the simulation frame-rate independent
                for _ in 0..4 {
                    if layout.step(STEP_DT) {
                        finished = true;
                        break;
                    }
                }
                ui.ctx().request_repaint();
            }
        }
        let requested = std::mem::take(&mut self.pending_fit);
        if self.auto_fit.due(now, finished) || requested {
            self.zoom_to_fit();
        }
        if let Some(wait) = self.auto_fit.pending(now) {
            ui.ctx().request_repaint_after(wait.max(Duration::from_millis(16)));
        }

        // Zoom with scroll only when pointer is over the canvas area
        if bg_resp.hovered() {
            let scroll = ui.input(|i| i.raw_scroll_delta.y);
            if scroll != 0.0 {
                let factor = (1.0 + scroll * 0.001).clamp(0.9, 1.1);
                let anchor = ui.input(|i| i.pointer.hover_pos()).unwrap_or(available.center());
                self.viewport.zoom_around(available, anchor, factor);
            }
        }
        if bg_resp.dragged() && self.dragging.is_none() {
            self.viewport.pan_by(bg_resp.drag_delta());
        }
        if bg_resp.clicked() {
            self.selected.clear();
        }

        let Some(layout) = self.layout.as_mut() else { return };
        let viewport = self.viewport;

        // Draw edges
        let show_captions = viewport.show_relationship_captions();
        let edge_stroke = Stroke::new(1.5, Color32::from_rgba_premultiplied(200, 200, 200, 180));
        for rel in &self.graph.relationships {
            let (Some(pa), Some(pb)) = (layout.position(&rel.from), layout.position(&rel.to)) else { continue };
            let a = viewport.to_screen(available, pa);
            let b = viewport.to_screen(available, pb);
            painter.line_segment([a, b], edge_stroke);
            // arrow head at target edge
            let dir = (b - a).normalized();
            let target_r = self.graph.get_node(&rel.to).map(|n| n.size * 0.5).unwrap_or(10.0) * viewport.zoom;
            let tip = b - dir * target_r;
            let mag = (8.0 * viewport.zoom).clamp(2.0, 16.0);
            let perp = Vec2::new(-dir.y, dir.x);
            painter.line_segment([tip, tip - dir * mag + perp * mag * 0.5], edge_stroke);
            painter.line_segment([tip, tip - dir * mag - perp * mag * 0.5], edge_stroke);
            if show_captions {
                painter.text(
                    a + (b - a) * 0.5,
                    egui::Align2::CENTER_CENTER,
                    &rel.caption,
                    egui::FontId::proportional((11.0 * viewport.zoom).clamp(8.0, 14.0)),
                    Color32::from_gray(210),
                );
            }
        }

        // Draw and interact with nodes
        let mut clicked: Option<ElementId> = None;
        let mut any_dragged = false;
        for node in &self.graph.nodes {
            let Some(pw) = layout.position(&node.id) else { continue };
            let ps = viewport.to_screen(available, pw);
            let radius = node.size * 0.5 * viewport.zoom;
            let rect = Rect::from_center_size(ps, Vec2::splat(radius.max(4.0) * 2.0));
            let resp = ui.interact(rect, ui.id().with(&node.id), Sense::click_and_drag());
            if resp.dragged() {
                self.dragging = Some(node.id.clone());
                any_dragged = true;
                let world = viewport.from_screen(available, ps + resp.drag_delta());
                layout.set_position(&node.id, world);
            }
            if resp.clicked() {
                clicked = Some(node.id.clone());
            }
            let degree = self.graph.degree(&node.id);
            resp.on_hover_ui(|ui| {
                ui.label(egui::RichText::new(node.caption.as_str()).strong());
                ui.monospace(node.id.as_str());
                ui.small(format!("degree: {}", degree));
            });

            let fill = parse_hex_color(&node.color).unwrap_or(Color32::from_rgb(60, 60, 60));
            let selected = self.selected.contains(&node.id);
            let stroke = if selected { Stroke::new(2.5, Color32::WHITE) } else { Stroke::new(1.0, Color32::DARK_GRAY) };
            painter.circle_filled(ps, radius, fill);
            painter.circle_stroke(ps, radius, stroke);

            let (anchor, pos) = match node.caption_align {
                CaptionAlign::Top => (egui::Align2::CENTER_BOTTOM, ps - Vec2::new(0.0, radius + 3.0)),
                CaptionAlign::Center => (egui::Align2::CENTER_CENTER, ps),
                CaptionAlign::Bottom => (egui::Align2::CENTER_TOP, ps + Vec2::new(0.0, radius + 3.0)),
            };
            painter.text(
                pos,
                anchor,
                &node.caption,
                egui::FontId::proportional((12.0 * viewport.zoom).clamp(8.0, 20.0)),
                Color32::from_gray(230),
            );
        }
        if !any_dragged && self.dragging.take().is_some() {
            layout.wake();
        }
        if let Some(id) = clicked {
            self.select(id);
        }
    }
}

/// Parse `#rrggbb`.
pub fn parse_hex_color(s: &str) -> Option<Color32> {
    let hex = s.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let v = u32::from_str_radix(hex, 16).ok()?;
    Some(Color32::from_rgb((v >> 16) as u8, (v >> 8) as u8, v as u8))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colors_parse() {
        assert_eq!(parse_hex_color("#588c7e"), Some(Color32::from_rgb(0x58, 0x8c, 0x7e)));
        assert_eq!(parse_hex_color("588c7e"), None);
        assert_eq!(parse_hex_color("#58"), None);
    }

    #[test]
    fn click_selection_follows_renderer_option() {
        let mut view = GraphView::open(ViewPoint::Graph, Instant::now());
        view.select("a".into());
        view.select("b".into());
        assert_eq!(view.selection(), ["b".to_string()]);

        view.viewport.options.single_selection = false;
        view.select("a".into());
        view.select("b".into());
        assert_eq!(view.selection(), ["a".to_string()]);
    }
}
