use std::collections::HashMap;
use std::fmt;

/// Toggleable slices of the extracted graph.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum GraphType {
    Document,
    Chunks,
    Entities,
}

impl GraphType {
    pub const ALL: [GraphType; 3] = [GraphType::Document, GraphType::Entities, GraphType::Chunks];

    /// Cypher fragment appended to the `paths` accumulator of the base template.
    pub fn fragment(self) -> &'static str {
        match self {
            GraphType::Document => "+ [docs]",
            GraphType::Chunks => {
                "+ collect { MATCH p=(c)-[:NEXT_CHUNK]-() RETURN p } \
                 + collect { MATCH p=(c)-[:SIMILAR]-() RETURN p }"
            }
            GraphType::Entities => {
                "+ collect { OPTIONAL MATCH (c:Chunk)-[:HAS_ENTITY]->(e), p=(e)-[*0..1]-(:!Chunk) RETURN p }"
            }
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GraphType::Document => "Document",
            GraphType::Chunks => "Chunks",
            GraphType::Entities => "Entities",
        }
    }
}

impl fmt::Display for GraphType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Selected facets in the order they were ticked. Never empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FacetSet {
    selected: Vec<GraphType>,
}

impl Default for FacetSet {
    fn default() -> Self {
        Self { selected: vec![GraphType::Entities] }
    }
}

impl FacetSet {
    pub fn contains(&self, facet: GraphType) -> bool {
        self.selected.contains(&facet)
    }

    /// True when `facet` is the only selected one and so cannot be unticked.
    pub fn is_locked(&self, facet: GraphType) -> bool {
        self.selected.len() == 1 && self.contains(facet)
    }

    /// Flip `facet`. Returns false (and changes nothing) when that would empty the set.
    pub fn toggle(&mut self, facet: GraphType) -> bool {
        if let Some(idx) = self.selected.iter().position(|f| *f == facet) {
            if self.selected.len() == 1 {
                return false;
            }
            self.selected.remove(idx);
        } else {
            self.selected.push(facet);
        }
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = GraphType> + '_ {
        self.selected.iter().copied()
    }

    pub fn len(&self) -> usize { self.selected.len() }
    pub fn is_empty(&self) -> bool { self.selected.is_empty() }

    /// Selected fragments joined with a single space.
    pub fn joined_fragments(&self) -> String {
        self.iter().map(GraphType::fragment).collect::<Vec<_>>().join(" ")
    }
}

/// Choices offered by the document-limit dropdown.
pub const DOC_LIMIT_CHOICES: [u32; 3] = [5, 10, 20];
pub const DEFAULT_DOC_LIMIT: u32 = 5;

/// Table mode inspects one named document; graph mode shows the latest documents.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ViewMode {
    Table,
    Graph { doc_limit: u32 },
}

impl ViewMode {
    pub fn graph(doc_limit: u32) -> Self {
        ViewMode::Graph { doc_limit: doc_limit.max(1) }
    }
}

/// Query text plus its parameters, ready to hand to the driver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraphQuery {
    pub text: String,
    pub params: HashMap<String, String>,
}

const DOCUMENT_PARAM: &str = "document_name";

// Shared tail: gather chunks, fold the facet fragments into `paths`, then
// project distinct nodes and relationships into plain maps.
fn template_tail(fragments: &str) -> String {
    format!(
        "CALL {{ WITH d
  OPTIONAL MATCH chunks=(d)<-[:PART_OF]-(c:Chunk)
  RETURN chunks, c LIMIT 50
}}
WITH [] {fragments} AS paths
CALL {{ WITH paths UNWIND paths AS path UNWIND nodes(path) AS node RETURN collect(DISTINCT node) AS nodes }}
CALL {{ WITH paths UNWIND paths AS path UNWIND relationships(path) AS rel RETURN collect(DISTINCT rel) AS rels }}
RETURN [n IN nodes | {{elementId: elementId(n), labels: labels(n), properties: properties(n)}}] AS nodes,
       [r IN rels | {{elementId: elementId(r), startNodeElementId: elementId(startNode(r)),
                      endNodeElementId: elementId(endNode(r)), type: type(r), properties: properties(r)}}] AS rels"
    )
}

/// Graph-mode query over the most recently created completed documents.
pub fn construct_query(fragments: &str, doc_limit: u32) -> String {
    format!(
        "MATCH docs = (d:Document {{status:'Completed'}})
WITH docs, d ORDER BY d.createdAt DESC
LIMIT {}
{}",
        doc_limit.max(1),
        template_tail(fragments)
    )
}

/// Table-mode query scoped to the document named by `$document_name`.
pub fn construct_doc_query(fragments: &str) -> String {
    format!(
        "MATCH docs = (d:Document {{fileName: ${}}})
{}",
        DOCUMENT_PARAM,
        template_tail(fragments)
    )
}

/// Combine the selected facets and view mode into a runnable query.
pub fn build_query(facets: &FacetSet, mode: ViewMode, inspected_name: &str) -> GraphQuery {
    let fragments = facets.joined_fragments();
    let text = match mode {
        ViewMode::Table => construct_doc_query(&fragments),
        ViewMode::Graph { doc_limit } => construct_query(&fragments, doc_limit),
    };
    let mut params = HashMap::new();
    params.insert(DOCUMENT_PARAM.to_string(), inspected_name.to_string());
    GraphQuery { text, params }
}
