use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use kg_viewer::api::sources::{sources_list_url, SourcesResponse};
use kg_viewer::connection::credentials::{ConnectionForm, Credentials};
use kg_viewer::connection::session::{ConnectionStatus, SessionManager};
use kg_viewer::error::ViewerError;
use kg_viewer::gql::query_builder::{build_query, FacetSet, GraphType, ViewMode};
use kg_viewer::gql::query_interface::{fetch_and_log, fetch_graph, StaticExecutor};
use kg_viewer::graph_utils::assemble::{assemble, PALETTE};
use kg_viewer::graph_utils::graph::{GraphNode, GraphRelationship, QueryRow};
use kg_viewer::gui::banner::BannerKind;
use kg_viewer::gui::connection_dialog::ConnectionDialog;
use kg_viewer::gui::graph_view::{GraphView, ViewPoint};
use kg_viewer::gui::viewport::Viewport;
use kg_viewer::persistence::settings::{AppSettings, SettingsStore};
use serde_json::json;

fn temp_dir(tag: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    std::env::temp_dir().join(format!("kg_viewer_test_{}_{}_{}", tag, std::process::id(), nanos))
}

fn document_row() -> QueryRow {
    QueryRow {
        nodes: vec![
            GraphNode::new("4:db:1", &["Document"]).with_property("fileName", "a.pdf"),
            GraphNode::new("4:db:2", &["Chunk"]).with_property("text", "Rust is a systems language"),
            GraphNode::new("4:db:3", &["Person"]).with_property("id", "Graydon"),
        ],
        relationships: vec![
            GraphRelationship::new("5:db:1", "4:db:2", "4:db:1", "PART_OF"),
            GraphRelationship::new("5:db:2", "4:db:2", "4:db:3", "HAS_ENTITY"),
        ],
    }
}

fn credentials() -> Credentials {
    let mut form = ConnectionForm::default();
    form.host = "db.example.com".into();
    form.password = "secret".into();
    form.credentials()
}

fn block_on<F: std::future::Future>(fut: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime")
        .block_on(fut)
}

#[test]
fn assemble_single_row_keeps_counts_and_endpoints() {
    let (graph, _scheme) = assemble(vec![document_row()]).expect("assembled");
    assert_eq!(graph.node_count(), 3);
    assert_eq!(graph.relationship_count(), 2);
    let ids = graph.node_ids();
    for r in &graph.relationships {
        assert!(ids.contains(&r.from), "dangling from {}", r.from);
        assert!(ids.contains(&r.to), "dangling to {}", r.to);
    }
    assert!(graph.dangling_relationships().is_empty());
    assert_eq!(graph.degree("4:db:2"), 2);
}

#[test]
fn assemble_document_node_caption_size_and_first_colour() {
    let (graph, scheme) = assemble(vec![document_row()]).expect("assembled");
    let doc = graph.get_node("4:db:1").expect("document node");
    assert_eq!(doc.caption, "a.pdf");
    assert_eq!(doc.size, 40.0);
    assert_eq!(doc.color, PALETTE[0]);
    assert_eq!(scheme.color_of("Chunk"), Some(PALETTE[1]));
    assert_eq!(graph.get_node("4:db:3").map(|n| n.caption.as_str()), Some("Graydon"));
}

#[test]
fn assemble_zero_rows_is_no_records() {
    let err = assemble(Vec::new()).unwrap_err();
    assert!(matches!(err, ViewerError::NoRecords));
    assert_eq!(err.to_string(), "No records found");
}

#[test]
fn assemble_colours_are_deterministic_per_label() {
    let (a, _) = assemble(vec![document_row()]).expect("first");
    let (b, _) = assemble(vec![document_row()]).expect("second");
    assert_eq!(a, b);
    // every node sharing a first label shares a colour
    let row = QueryRow {
        nodes: vec![
            GraphNode::new("1", &["Person"]),
            GraphNode::new("2", &["Company"]),
            GraphNode::new("3", &["Person", "Founder"]),
        ],
        relationships: vec![],
    };
    let (g, scheme) = assemble(vec![row]).expect("assembled");
    assert_eq!(g.nodes[0].color, g.nodes[2].color);
    assert_ne!(g.nodes[0].color, g.nodes[1].color);
    assert_eq!(scheme.len(), 2);
}

#[test]
fn assemble_multiple_rows_flattens_row_major() {
    let rows = vec![
        QueryRow {
            nodes: vec![GraphNode::new("a", &["Document"]), GraphNode::new("b", &["Chunk"])],
            relationships: vec![GraphRelationship::new("r1", "b", "a", "PART_OF")],
        },
        QueryRow {
            nodes: vec![GraphNode::new("c", &["Document"])],
            relationships: vec![],
        },
    ];
    let (graph, _) = assemble(rows).expect("assembled");
    assert_eq!(graph.node_ids(), vec!["a".to_string(), "b".to_string(), "c".to_string()]);
    assert_eq!(graph.relationships[0].caption, "PART_OF");
}

#[test]
fn assemble_rows_sharing_a_document_emit_each_id_once() {
    let doc = GraphNode::new("4:db:0", &["Document"]).with_property("fileName", "a.pdf");
    let rows: Vec<QueryRow> = (1..=3)
        .map(|i| QueryRow {
            nodes: vec![doc.clone(), GraphNode::new(format!("4:db:{}", i), &["Chunk"])],
            relationships: vec![
                GraphRelationship::new(format!("5:db:{}", i), format!("4:db:{}", i), "4:db:0", "PART_OF"),
                GraphRelationship::new("5:db:99", "4:db:1", "4:db:0", "FIRST_CHUNK"),
            ],
        })
        .collect();
    let (graph, scheme) = assemble(rows).expect("assembled");
    assert_eq!(
        graph.node_ids(),
        vec!["4:db:0".to_string(), "4:db:1".to_string(), "4:db:2".to_string(), "4:db:3".to_string()]
    );
    let rel_ids: Vec<&str> = graph.relationships.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(rel_ids, vec!["5:db:1", "5:db:99", "5:db:2", "5:db:3"]);
    assert_eq!(graph.get_node("4:db:0").map(|n| n.color.as_str()), Some(PALETTE[0]));
    assert_eq!(scheme.len(), 2);
    assert_eq!(graph.degree("4:db:0"), 4);
}

#[test]
fn facet_set_never_empties() {
    let mut facets = FacetSet::default();
    assert!(facets.contains(GraphType::Entities));
    assert!(facets.is_locked(GraphType::Entities));
    assert!(!facets.toggle(GraphType::Entities));
    assert_eq!(facets.len(), 1);

    assert!(facets.toggle(GraphType::Document));
    assert!(!facets.is_locked(GraphType::Entities));
    assert!(facets.toggle(GraphType::Entities));
    assert!(facets.is_locked(GraphType::Document));
}

#[test]
fn build_query_table_and_graph_modes() {
    let mut facets = FacetSet::default();
    facets.toggle(GraphType::Document);

    let table = build_query(&facets, ViewMode::Table, "a.pdf");
    assert!(table.text.contains("$document_name"));
    assert!(!table.text.contains("LIMIT 5"));
    assert_eq!(table.params.get("document_name").map(String::as_str), Some("a.pdf"));

    let graph = build_query(&facets, ViewMode::graph(10), "");
    assert!(graph.text.contains("LIMIT 10\n"));
    assert!(graph.text.contains("status:'Completed'"));
    assert!(graph.text.contains("+ [docs]"));
    assert!(graph.text.contains("HAS_ENTITY"));
    assert!(!graph.text.contains("NEXT_CHUNK"));
}

#[test]
fn connection_form_requires_password() {
    let mut form = ConnectionForm::default();
    form.host = "localhost".into();
    assert!(!form.can_submit());
    form.password = "pw".into();
    assert!(form.can_submit());
    assert_eq!(form.connection_uri(), "neo4j+s://localhost:7687");
}

#[test]
fn failed_connection_clears_password_and_banner_expires() {
    let dir = temp_dir("dialog");
    let store = SettingsStore::at(&dir);
    let mut settings = AppSettings::default();
    let mut dialog = ConnectionDialog::new(&settings);
    dialog.form.host = "db.example.com".into();
    dialog.form.port = "7688".into();
    dialog.form.password = "hunter2".into();

    let creds = dialog.submit(&mut settings, &store).expect("valid form");
    assert_eq!(creds.uri, "neo4j+s://db.example.com:7688");
    assert!(dialog.submitting);

    let now = Instant::now();
    dialog.on_failed("Unauthorized", now);
    assert!(dialog.form.password.is_empty());
    assert!(!dialog.submitting);
    assert_eq!(dialog.banner.kind(), BannerKind::Danger);

    dialog.tick(now + Duration::from_millis(4999));
    assert!(dialog.banner.is_visible());
    dialog.tick(now + Duration::from_millis(5000));
    assert_eq!(dialog.banner.kind(), BannerKind::Neutral);

    // non-secret fields were persisted, the password never is
    let written = std::fs::read_to_string(dir.join("settings.json")).expect("settings written");
    assert!(written.contains("db.example.com"));
    assert!(written.contains("7688"));
    assert!(!written.contains("hunter2"));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn settings_round_trip_and_defaults() {
    let dir = temp_dir("settings");
    let store = SettingsStore::at(&dir);
    assert_eq!(store.load(), AppSettings::default());

    let mut s = AppSettings::default();
    s.hostname = "graph.internal".into();
    s.selected_protocol = "bolt".into();
    s.backend_url = "http://backend:9000".into();
    store.save(&s).expect("saved");
    assert_eq!(store.load(), s);

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.join("settings.json")).expect("read")).expect("json");
    assert_eq!(raw["selectedProtocol"], "bolt");
    assert!(raw.get("password").is_none());
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn sources_url_encodes_password() {
    let url = sources_list_url("http://localhost:8000/", &credentials()).expect("url");
    assert_eq!(url.path(), "/sources_list");
    let pairs: Vec<(String, String)> = url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect();
    assert!(pairs.contains(&("password".into(), "c2VjcmV0".into())));
    assert!(pairs.contains(&("userName".into(), "neo4j".into())));
    assert!(pairs.contains(&("uri".into(), "neo4j+s://db.example.com:7687".into())));
}

#[test]
fn sources_response_parses_both_shapes() {
    let wrapped = SourcesResponse::from_value(json!({
        "status": "Success",
        "data": [{"fileName": "a.pdf", "status": "Completed", "nodeCount": 12}]
    }))
    .expect("wrapped");
    assert!(wrapped.is_success());
    assert_eq!(wrapped.data[0].file_name, "a.pdf");
    assert_eq!(wrapped.data[0].node_count, Some(12));

    let bare = SourcesResponse::from_value(json!([{"fileName": "b.txt"}])).expect("bare");
    assert_eq!(bare.data.len(), 1);

    let failed = SourcesResponse::from_value(json!({"status": "Failed", "error": "bad creds"})).expect("failed");
    assert!(!failed.is_success());
}

#[test]
fn fetch_graph_runs_executor_and_assembles() {
    let exec = StaticExecutor { rows: vec![document_row()], fail_with: None };
    let query = build_query(&FacetSet::default(), ViewMode::graph(5), "");
    let outcome = block_on(fetch_graph(&exec, &query)).expect("outcome");
    assert_eq!(outcome.rows, 1);
    assert_eq!(outcome.graph.node_count(), 3);

    let empty = StaticExecutor::default();
    assert!(matches!(block_on(fetch_graph(&empty, &query)), Err(ViewerError::NoRecords)));

    let failing = StaticExecutor { rows: vec![], fail_with: Some("Connection refused".into()) };
    let err = block_on(fetch_graph(&failing, &query)).unwrap_err();
    assert_eq!(err.to_string(), "Connection refused");
}

#[test]
fn fetch_and_log_writes_dated_log() {
    let dir = temp_dir("querylog");
    let exec = StaticExecutor { rows: vec![document_row()], fail_with: None };
    let query = build_query(&FacetSet::default(), ViewMode::Table, "a.pdf");
    block_on(fetch_and_log(&exec, &query, Some(dir.as_path()))).expect("outcome");
    let logs: Vec<_> = std::fs::read_dir(&dir).expect("log dir").flatten().collect();
    assert_eq!(logs.len(), 1);
    let name = logs[0].file_name().to_string_lossy().to_string();
    assert!(name.starts_with("queries_") && name.ends_with(".log"));
    let body = std::fs::read_to_string(logs[0].path()).expect("log body");
    assert!(body.contains("OK rows=1 nodes=3 rels=2"));
    assert!(body.contains("document_name=\"a.pdf\""));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn session_manager_lifecycle() {
    let mut session = SessionManager::new();
    assert_eq!(session.status(), ConnectionStatus::Disconnected);
    assert!(matches!(session.executor(), Err(ViewerError::NotConnected)));

    session.begin_connect();
    assert_eq!(session.status(), ConnectionStatus::Connecting);
    session.install(credentials(), Arc::new(StaticExecutor::default()));
    assert!(session.is_connected());
    assert!(session.executor().is_ok());
    assert_eq!(session.credentials().map(|c| c.database.as_str()), Some("neo4j"));

    session.close();
    assert!(!session.is_connected());
    assert!(session.credentials().is_none());
    assert!(session.executor().is_err());
}

#[test]
fn viewport_zoom_is_clamped() {
    let mut v = Viewport::default();
    for _ in 0..20 {
        v.zoom_in();
    }
    assert_eq!(v.zoom, v.options.max_zoom);
    for _ in 0..40 {
        v.zoom_out();
    }
    assert_eq!(v.zoom, v.options.min_zoom);
    assert!(!v.show_relationship_captions());
    v.set_zoom(0.55);
    assert!(v.show_relationship_captions());
}

#[test]
fn graph_view_table_mode_queries_once_per_change() {
    let mut view = GraphView::open(ViewPoint::Table { document: "a.pdf".into() }, Instant::now());
    assert_eq!(view.title(), "Inspect Generated Graph from a.pdf");
    assert_eq!(view.available_facets(), &[GraphType::Document, GraphType::Entities]);

    let q = view.take_pending_query().expect("initial query");
    assert!(view.is_loading());
    assert_eq!(q.params.get("document_name").map(String::as_str), Some("a.pdf"));
    assert!(view.take_pending_query().is_none());

    // unticking the last facet is refused and does not requery
    assert!(!view.toggle_facet(GraphType::Entities));
    assert!(view.take_pending_query().is_none());
    assert!(view.toggle_facet(GraphType::Document));
    assert!(view.take_pending_query().is_some());

    view.apply_result(Err(ViewerError::NoRecords));
    assert!(!view.is_loading());
    assert_eq!(view.banner().message(), "No records found");
    assert_eq!(view.graph().node_count(), 0);
}

#[test]
fn graph_view_graph_mode_applies_results() {
    let mut view = GraphView::open(ViewPoint::Graph, Instant::now());
    assert_eq!(view.title(), "Generated Graph");
    assert_eq!(view.available_facets().len(), 3);
    view.set_doc_limit(20);
    assert_eq!(view.doc_limit(), 20);
    assert!(view.toggle_facet(GraphType::Chunks));
    assert_eq!(view.facets().iter().collect::<Vec<_>>(), vec![GraphType::Entities, GraphType::Chunks]);
    let q = view.take_pending_query().expect("query");
    assert!(q.text.contains("NEXT_CHUNK"));
    assert!(q.text.contains("LIMIT 20\n"));

    let exec = StaticExecutor { rows: vec![document_row()], fail_with: None };
    let outcome = block_on(fetch_graph(&exec, &q));
    view.apply_result(outcome);
    assert!(!view.banner().is_visible());
    assert_eq!(view.graph().node_count(), 3);
    assert_eq!(view.scheme().entries().len(), 3);
}

#[test]
fn graph_view_zoom_buttons_scale_about_centre() {
    let mut view = GraphView::open(ViewPoint::Graph, Instant::now());
    let start = *view.viewport();
    view.zoom_in();
    assert!((view.viewport().zoom - start.zoom * 1.3).abs() < 1e-6);
    assert_eq!(view.viewport().pan, start.pan);
    view.zoom_out();
    assert!((view.viewport().zoom - start.zoom * 1.3 * 0.7).abs() < 1e-6);
}
