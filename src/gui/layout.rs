use std::collections::HashMap;

use eframe::egui::{Pos2, Rect, Vec2};

use crate::graph_utils::graph::{ElementId, VisualGraph};

/// Spring-damper layout over the assembled graph, in world coordinates.
///
/// Edges pull their endpoints toward a preferred length, close pairs push
/// apart, and a weak gravity keeps components near the origin. The layout
/// reports completion once nodes stop moving or the step budget runs out.
pub struct ForceLayout {
    order: Vec<ElementId>,
    positions: HashMap<ElementId, Pos2>,
    velocities: HashMap<ElementId, Vec2>,
    edges: Vec<(usize, usize)>,
    steps: u32,
    computing: bool,
}

const TARGET_DIST: f32 = 120.0; // preferred edge length in world space
const SPRING_K: f32 = 4.0;
const DAMPING: f32 = 6.0;
const MIN_SEP: f32 = 90.0;
const REPULSE_K: f32 = 10.0;
const GRAVITY_K: f32 = 0.15;
const MAX_SPEED: f32 = 600.0;
const MAX_STEP: f32 = 5.0;
const REST_SPEED: f32 = 2.0; // below this for every node the layout is settled
const MAX_STEPS: u32 = 600;
pub const STEP_DT: f32 = 1.0 / 60.0;

impl ForceLayout {
    pub fn new(graph: &VisualGraph) -> Self {
        let order: Vec<ElementId> = graph.nodes.iter().map(|n| n.id.clone()).collect();
        let index: HashMap<&str, usize> = order.iter().enumerate().map(|(i, id)| (id.as_str(), i)).collect();
        // dangling edges are skipped
        let edges = graph
            .relationships
            .iter()
            .filter_map(|r| Some((*index.get(r.from.as_str())?, *index.get(r.to.as_str())?)))
            .filter(|(a, b)| a != b)
            .collect();
        let positions = order
            .iter()
            .enumerate()
            .map(|(k, id)| (id.clone(), golden_spiral_position(Pos2::ZERO, k as u32)))
            .collect();
        let velocities = order.iter().map(|id| (id.clone(), Vec2::ZERO)).collect();
        Self {
            computing: !order.is_empty(),
            order,
            positions,
            velocities,
            edges,
            steps: 0,
        }
    }

    pub fn position(&self, id: &str) -> Option<Pos2> {
        self.positions.get(id).copied()
    }

    pub fn set_position(&mut self, id: &str, pos: Pos2) {
        if let Some(p) = self.positions.get_mut(id) {
            *p = pos;
            self.velocities.insert(id.to_string(), Vec2::ZERO);
        }
    }

    pub fn is_computing(&self) -> bool { self.computing }

    /// Resume simulation, e.g. after the user dragged a node.
    pub fn wake(&mut self) {
        if !self.order.is_empty() {
            self.computing = true;
            self.steps = 0;
        }
    }

    /// World-space bounding box of the given ids, if any are known.
    pub fn bounds<'a>(&self, ids: impl IntoIterator<Item = &'a str>) -> Option<Rect> {
        let mut it = ids.into_iter().filter_map(|id| self.position(id));
        let first = it.next()?;
        Some(it.fold(Rect::from_min_max(first, first), |r, p| r.union(Rect::from_min_max(p, p))))
    }

    /// Advance one fixed step. Returns true exactly on the step the layout settles.
    pub fn step(&mut self, dt: f32) -> bool {
        if !self.computing {
            return false;
        }
        let n = self.order.len();
        let pos: Vec<Pos2> = self.order.iter().map(|id| self.positions[id]).collect();
        let mut forces = vec![Vec2::ZERO; n];

        // Relationship springs (attract if stretched, repel if compressed)
        for &(a, b) in &self.edges {
            let d = pos[b] - pos[a];
            let dist = d.length();
            if dist > 1e-3 {
                let f = d / dist * (SPRING_K * (dist - TARGET_DIST));
                forces[a] += f;
                forces[b] -= f;
            }
        }

        // Degree-aware separation for close pairs
        let mut deg = vec![0usize; n];
        for &(a, b) in &self.edges {
            deg[a] += 1;
            deg[b] += 1;
        }
        for i in 0..n {
            for j in (i + 1)..n {
                let d = pos[j] - pos[i];
                let dist = d.length();
                if dist < 1e-3 || dist >= MIN_SEP {
                    continue;
                }
                let f = d / dist * (REPULSE_K * (MIN_SEP - dist));
                forces[i] -= f * (1.0 + (deg[i] as f32 + 1.0).ln());
                forces[j] += f * (1.0 + (deg[j] as f32 + 1.0).ln());
            }
        }

        for (i, p) in pos.iter().enumerate() {
            forces[i] -= p.to_vec2() * GRAVITY_K;
        }

        let mut fastest = 0.0_f32;
        for (i, id) in self.order.iter().enumerate() {
            let mut v = self.velocities[id];
            v += (forces[i] - v * DAMPING) * dt;
            let speed = v.length();
            if speed > MAX_SPEED {
                v *= MAX_SPEED / speed;
            }
            let mut step = v * dt;
            let step_len = step.length();
            if step_len > MAX_STEP {
                step *= MAX_STEP / step_len;
            }
            if let Some(p) = self.positions.get_mut(id) {
                *p += step;
            }
            fastest = fastest.max(v.length());
            self.velocities.insert(id.clone(), v);
        }

        self.steps += 1;
        if fastest < REST_SPEED || self.steps >= MAX_STEPS {
            self.computing = false;
            for v in self.velocities.values_mut() {
                *v = Vec2::ZERO;
            }
            log::debug!("layout settled after {} steps", self.steps);
            return true;
        }
        false
    }
}

// Golden-angle spiral placement around the provided center.
// k is the 0-based index along the spiral.
fn golden_spiral_position(center: Pos2, k: u32) -> Pos2 {
    let golden_angle = std::f32::consts::TAU * (1.0 - 1.0 / 1.618_033_9);
    let t = k as f32;
    let r = 40.0 * t.sqrt();
    let theta = t * golden_angle;
    Pos2::new(center.x + r * theta.cos(), center.y + r * theta.sin())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph_utils::graph::{CaptionAlign, VisualNode, VisualRelationship};

    fn node(id: &str) -> VisualNode {
        VisualNode {
            id: id.into(),
            size: 20.0,
            caption_align: CaptionAlign::Bottom,
            caption: id.into(),
            color: "#588c7e".into(),
        }
    }

    #[test]
    fn empty_graph_never_computes() {
        let mut l = ForceLayout::new(&VisualGraph::default());
        assert!(!l.is_computing());
        assert!(!l.step(STEP_DT));
    }

    #[test]
    fn layout_settles_and_reports_once() {
        let g = VisualGraph {
            nodes: vec![node("a"), node("b"), node("c")],
            relationships: vec![
                VisualRelationship { id: "r1".into(), from: "a".into(), to: "b".into(), caption: "X".into() },
                VisualRelationship { id: "r2".into(), from: "b".into(), to: "ghost".into(), caption: "X".into() },
            ],
        };
        let mut l = ForceLayout::new(&g);
        let mut finished = 0;
        for _ in 0..(MAX_STEPS + 10) {
            if l.step(STEP_DT) {
                finished += 1;
            }
        }
        assert_eq!(finished, 1);
        assert!(!l.is_computing());
        assert!(l.bounds(["a", "b", "c"]).is_some());
    }
}
