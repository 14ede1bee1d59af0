use std::time::{Duration, Instant};

use eframe::egui::{Pos2, Rect, Vec2};

/// Fixed renderer configuration.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RendererOptions {
    pub max_zoom: f32,
    pub min_zoom: f32,
    /// Relationship captions are hidden below this zoom.
    pub relationship_threshold: f32,
    pub single_selection: bool,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            max_zoom: 3.0,
            min_zoom: 0.05,
            relationship_threshold: 0.55,
            single_selection: true,
        }
    }
}

pub const ZOOM_IN_FACTOR: f32 = 1.3;
pub const ZOOM_OUT_FACTOR: f32 = 0.7;
const FIT_PADDING: f32 = 40.0;

/// Pan/zoom state mapping world coordinates (origin-centred) onto the canvas.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Viewport {
    pub zoom: f32,
    pub pan: Vec2,
    pub options: RendererOptions,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { zoom: 1.0, pan: Vec2::ZERO, options: RendererOptions::default() }
    }
}

impl Viewport {
    pub fn to_screen(&self, canvas: Rect, p: Pos2) -> Pos2 {
        canvas.center() + p.to_vec2() * self.zoom + self.pan
    }

    pub fn from_screen(&self, canvas: Rect, p: Pos2) -> Pos2 {
        ((p - canvas.center() - self.pan) / self.zoom).to_pos2()
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom.clamp(self.options.min_zoom, self.options.max_zoom);
    }

    /// Zoom by `factor` about the canvas centre. The centre maps to
    /// `-pan / zoom` in world space, so scaling `pan` keeps it fixed.
    pub fn zoom_by(&mut self, factor: f32) {
        let old = self.zoom;
        self.set_zoom(old * factor);
        self.pan *= self.zoom / old;
    }

    pub fn zoom_in(&mut self) {
        self.zoom_by(ZOOM_IN_FACTOR);
    }

    pub fn zoom_out(&mut self) {
        self.zoom_by(ZOOM_OUT_FACTOR);
    }

    /// Zoom by `factor` keeping the world point under `anchor` fixed on screen.
    pub fn zoom_around(&mut self, canvas: Rect, anchor: Pos2, factor: f32) {
        let world = self.from_screen(canvas, anchor);
        self.set_zoom(self.zoom * factor);
        let moved = self.to_screen(canvas, world);
        self.pan += anchor - moved;
    }

    pub fn pan_by(&mut self, delta: Vec2) {
        self.pan += delta;
    }

    /// Centre `bounds` (world space) in `canvas`, zooming so it fits with padding.
    /// `None` leaves the view untouched.
    pub fn fit(&mut self, canvas: Rect, bounds: Option<Rect>) {
        let Some(b) = bounds else { return };
        let avail = (canvas.size() - Vec2::splat(2.0 * FIT_PADDING)).max(Vec2::splat(1.0));
        if b.width() > 1e-3 || b.height() > 1e-3 {
            let zx = if b.width() > 1e-3 { avail.x / b.width() } else { f32::INFINITY };
            let zy = if b.height() > 1e-3 { avail.y / b.height() } else { f32::INFINITY };
            self.set_zoom(zx.min(zy));
        } else {
            self.set_zoom(self.zoom.min(1.0));
        }
        self.pan = -b.center().to_vec2() * self.zoom;
    }

    pub fn show_relationship_captions(&self) -> bool {
        self.zoom >= self.options.relationship_threshold
    }
}

pub const INITIAL_FIT_DELAY: Duration = Duration::from_secs(1);

/// Decides when the view should re-fit: once, a second after opening, and
/// every time the layout finishes computing.
#[derive(Debug, Clone)]
pub struct AutoFit {
    opened_at: Instant,
    initial_done: bool,
}

impl AutoFit {
    pub fn new(now: Instant) -> Self {
        Self { opened_at: now, initial_done: false }
    }

    pub fn due(&mut self, now: Instant, layout_finished: bool) -> bool {
        let initial = !self.initial_done && now.duration_since(self.opened_at) >= INITIAL_FIT_DELAY;
        if initial {
            self.initial_done = true;
        }
        initial || layout_finished
    }

    /// Time left until the initial fit, for repaint scheduling.
    pub fn pending(&self, now: Instant) -> Option<Duration> {
        if self.initial_done {
            None
        } else {
            Some(INITIAL_FIT_DELAY.saturating_sub(now.duration_since(self.opened_at)))
        }
    }
}
