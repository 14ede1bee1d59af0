use std::collections::{HashMap, HashSet};

use crate::error::{ViewerError, ViewerResult};
use super::graph::{
    CaptionAlign, GraphNode, GraphRelationship, QueryRow, VisualGraph, VisualNode, VisualRelationship,
};

/// Fixed palette; labels beyond its length wrap around.
pub const PALETTE: [&str; 12] = [
    "#588c7e", "#f2e394", "#f2ae72", "#d96459", "#5b9aa0", "#d6d4e0",
    "#b8a9c9", "#622569", "#ddd5af", "#d9ad7c", "#a2836e", "#674d3c",
];

const TEXT_CAPTION_MAX: usize = 40;

/// Label -> colour mapping, built per assembled result and never merged across runs.
#[derive(Debug, Default, Clone)]
pub struct ColorScheme {
    colors: HashMap<String, &'static str>,
    // labels in first-seen order
    order: Vec<String>,
}

impl ColorScheme {
    pub fn new() -> Self { Self::default() }

    /// Assign the next palette colour to `label` if it has none yet.
    pub fn observe(&mut self, label: &str) -> &'static str {
        if let Some(c) = self.colors.get(label) {
            return *c;
        }
        let color = PALETTE[self.order.len() % PALETTE.len()];
        self.colors.insert(label.to_string(), color);
        self.order.push(label.to_string());
        color
    }

    pub fn color_of(&self, label: &str) -> Option<&'static str> {
        self.colors.get(label).copied()
    }

    /// (label, colour) pairs in assignment order, for the legend.
    pub fn entries(&self) -> Vec<(&str, &'static str)> {
        self.order
            .iter()
            .map(|l| (l.as_str(), self.colors[l]))
            .collect()
    }

    pub fn len(&self) -> usize { self.order.len() }
    pub fn is_empty(&self) -> bool { self.order.is_empty() }
}

/// Caption shown under a node: name, file name, id, then truncated text,
/// falling back to the element id.
pub fn node_caption(node: &GraphNode) -> String {
    for key in ["name", "fileName", "id"] {
        if let Some(v) = node.property_str(key) {
            return v.to_string();
        }
    }
    if let Some(text) = node.property_str("text") {
        if text.chars().count() > TEXT_CAPTION_MAX {
            let head: String = text.chars().take(TEXT_CAPTION_MAX).collect();
            return format!("{}...", head.trim_end());
        }
        return text.to_string();
    }
    node.element_id.clone()
}

/// Documents are drawn largest, chunks medium, entities small.
pub fn node_size(node: &GraphNode) -> f32 {
    match node.first_label() {
        Some("Document") => 40.0,
        Some("Chunk") => 30.0,
        _ => 20.0,
    }
}

/// Row-major flattening: every node of row 0, then row 1, and so on.
/// Each element id is kept once, at its first occurrence; rows of the graph
/// templates repeat the document and shared entities.
pub fn flatten_rows(rows: Vec<QueryRow>) -> (Vec<GraphNode>, Vec<GraphRelationship>) {
    let mut nodes = Vec::new();
    let mut rels = Vec::new();
    let mut seen_nodes = HashSet::new();
    let mut seen_rels = HashSet::new();
    for row in rows {
        for n in row.nodes {
            if seen_nodes.insert(n.element_id.clone()) {
                nodes.push(n);
            }
        }
        for r in row.relationships {
            if seen_rels.insert(r.element_id.clone()) {
                rels.push(r);
            }
        }
    }
    (nodes, rels)
}

/// Reshape raw result rows into the renderer payload.
pub fn assemble(rows: Vec<QueryRow>) -> ViewerResult<(VisualGraph, ColorScheme)> {
    if rows.is_empty() {
        return Err(ViewerError::NoRecords);
    }
    let (nodes, rels) = flatten_rows(rows);

    let mut scheme = ColorScheme::new();
    for n in &nodes {
        scheme.observe(n.first_label().unwrap_or_default());
    }

    let visual_nodes = nodes
        .iter()
        .map(|n| VisualNode {
            id: n.element_id.clone(),
            size: node_size(n),
            caption_align: CaptionAlign::Bottom,
            caption: node_caption(n),
            color: scheme
                .color_of(n.first_label().unwrap_or_default())
                .unwrap_or(PALETTE[0])
                .to_string(),
        })
        .collect();

    let visual_rels = rels
        .into_iter()
        .map(|r| VisualRelationship {
            id: r.element_id,
            from: r.start_element_id,
            to: r.end_element_id,
            caption: r.rel_type,
        })
        .collect();

    Ok((VisualGraph { nodes: visual_nodes, relationships: visual_rels }, scheme))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caption_prefers_name_then_file_name() {
        let n = GraphNode::new("4:x:1", &["Document"])
            .with_property("fileName", "report.pdf")
            .with_property("name", "Quarterly");
        assert_eq!(node_caption(&n), "Quarterly");
        let n = GraphNode::new("4:x:2", &["Document"]).with_property("fileName", "report.pdf");
        assert_eq!(node_caption(&n), "report.pdf");
    }

    #[test]
    fn caption_truncates_chunk_text() {
        let text = "a".repeat(60);
        let n = GraphNode::new("4:x:3", &["Chunk"]).with_property("text", text);
        let c = node_caption(&n);
        assert!(c.ends_with("..."));
        assert_eq!(c.chars().count(), TEXT_CAPTION_MAX + 3);
    }

    #[test]
    fn caption_falls_back_to_element_id() {
        let n = GraphNode::new("4:x:4", &["Person"]).with_property("name", "  ");
        assert_eq!(node_caption(&n), "4:x:4");
    }

    #[test]
    fn palette_wraps_after_twelve_labels() {
        let mut s = ColorScheme::new();
        for i in 0..PALETTE.len() {
            s.observe(&format!("L{}", i));
        }
        assert_eq!(s.observe("L12"), PALETTE[0]);
        assert_eq!(s.observe("L1"), PALETTE[1]);
        assert_eq!(s.len(), 13);
    }
}
