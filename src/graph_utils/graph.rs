use std::collections::{HashMap, HashSet};
use serde::{Serialize, Deserialize};
use serde_json::Value;

// Basic type aliases for clarity
pub type ElementId = String;
type Key = String;

/// A node as returned by the database, keyed by its element identifier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    #[serde(rename = "elementId")]
    pub element_id: ElementId,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub properties: HashMap<Key, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphRelationship {
    #[serde(rename = "elementId")]
    pub element_id: ElementId,
    #[serde(rename = "startNodeElementId")]
    pub start_element_id: ElementId,
    #[serde(rename = "endNodeElementId")]
    pub end_element_id: ElementId,
    #[serde(rename = "type")]
    pub rel_type: String,
    #[serde(default)]
    pub properties: HashMap<Key, Value>,
}

/// One matched record: the `nodes` and `rels` columns of the graph queries.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryRow {
    pub nodes: Vec<GraphNode>,
    pub relationships: Vec<GraphRelationship>,
}

impl GraphNode {
    pub fn new(element_id: impl Into<String>, labels: &[&str]) -> Self {
        GraphNode {
            element_id: element_id.into(),
            labels: labels.iter().map(|l| l.to_string()).collect(),
            properties: HashMap::new(),
        }
    }

    pub fn with_property(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    pub fn first_label(&self) -> Option<&str> {
        self.labels.first().map(String::as_str)
    }

    /// String value of a property, if present and non-empty.
    pub fn property_str(&self, key: &str) -> Option<&str> {
        match self.properties.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.as_str()),
            _ => None,
        }
    }
}

impl GraphRelationship {
    pub fn new(
        element_id: impl Into<String>,
        start: impl Into<String>,
        end: impl Into<String>,
        rel_type: impl Into<String>,
    ) -> Self {
        GraphRelationship {
            element_id: element_id.into(),
            start_element_id: start.into(),
            end_element_id: end.into(),
            rel_type: rel_type.into(),
            properties: HashMap::new(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionAlign {
    Top,
    Center,
    Bottom,
}

/// Renderer-ready node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VisualNode {
    pub id: ElementId,
    pub size: f32,
    #[serde(rename = "captionAlign")]
    pub caption_align: CaptionAlign,
    pub caption: String,
    pub color: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VisualRelationship {
    pub id: ElementId,
    pub from: ElementId,
    pub to: ElementId,
    pub caption: String,
}

/// The payload handed to the graph renderer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VisualGraph {
    pub nodes: Vec<VisualNode>,
    pub relationships: Vec<VisualRelationship>,
}

impl VisualGraph {
    pub fn node_ids(&self) -> Vec<ElementId> {
        self.nodes.iter().map(|n| n.id.clone()).collect()
    }

    pub fn get_node(&self, id: &str) -> Option<&VisualNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_count(&self) -> usize { self.nodes.len() }
    pub fn relationship_count(&self) -> usize { self.relationships.len() }

    /// Relationships whose `from` or `to` is not among the emitted nodes.
    /// The query is expected to keep this empty; the renderer skips any it finds.
    pub fn dangling_relationships(&self) -> Vec<&VisualRelationship> {
        let ids: HashSet<&str> = self.nodes.iter().map(|n| n.id.as_str()).collect();
        self
            .relationships
            .iter()
            .filter(|r| !ids.contains(r.from.as_str()) || !ids.contains(r.to.as_str()))
            .collect()
    }

    pub fn degree(&self, id: &str) -> usize {
        self
            .relationships
            .iter()
            .filter(|r| r.from == id || r.to == id)
            .count()
    }
}
