//! End-to-end export tests against an in-memory graph.
//!
//! Every test writes a real gzip file and reads it back with `GzDecoder`.

#![allow(clippy::pedantic)]

use async_trait::async_trait;
use flate2::read::GzDecoder;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tempfile::TempDir;

use neo4j_json_io::{
    export_graph, Error, ExportOptions, ExtractedPage, GraphExporter, GraphNode,
    GraphRelationship, GraphSession, MemoryGraph, Point, Properties, PropertyValue, Result,
    TemporalKind,
};

fn read_text(path: &Path) -> String {
    let mut text = String::new();
    GzDecoder::new(File::open(path).unwrap())
        .read_to_string(&mut text)
        .unwrap();
    text
}

fn read_document(path: &Path) -> Value {
    serde_json::from_str(&read_text(path)).unwrap()
}

fn props(entries: &[(&str, PropertyValue)]) -> Properties {
    entries
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

fn small_pages() -> GraphExporter {
    GraphExporter::new(ExportOptions {
        page_size: 2,
        ..Default::default()
    })
}

fn social_graph() -> MemoryGraph {
    let mut graph = MemoryGraph::new();
    graph
        .add_node("p1", &["Person", "Employee"], props(&[("name", "Alice".into())]))
        .add_node("p2", &["Person"], props(&[("name", "Bob".into())]))
        .add_node("p3", &["Person"], props(&[("name", "Carol".into())]))
        .add_node("c1", &["Company"], props(&[("name", "Acme".into())]))
        .add_node("c2", &["Company"], Properties::new())
        .add_relationship("k1", "KNOWS", "p1", "p2", props(&[("since", 2019i64.into())]))
        .add_relationship("k2", "KNOWS", "p2", "p3", Properties::new())
        .add_relationship("k3", "KNOWS", "p3", "p1", Properties::new())
        .add_relationship("w1", "WORKS_AT", "p1", "c1", Properties::new())
        .add_relationship("w2", "WORKS_AT", "p3", "c2", Properties::new());
    graph
}

#[tokio::test]
async fn test_empty_graph_document() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("empty.json.gz");
    let mut graph = MemoryGraph::new();

    let stats = export_graph(&mut graph, &output).await.unwrap();

    assert_eq!(stats.nodes, 0);
    assert_eq!(stats.relationships, 0);
    let compact: String = read_text(&output)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    assert_eq!(compact, r#"{"graph":{"nodes":{},"edges":[]}}"#);
    assert!(graph.is_closed());
}

#[tokio::test]
async fn test_single_node_without_properties() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("one.json.gz");
    let mut graph = MemoryGraph::new();
    graph.add_node("4:abc:0", &["Thing"], Properties::new());

    export_graph(&mut graph, &output).await.unwrap();

    assert_eq!(
        read_document(&output),
        json!({
            "graph": {
                "nodes": { "4:abc:0": { "label": "Thing", "metadata": {} } },
                "edges": []
            }
        })
    );
}

#[tokio::test]
async fn test_every_property_kind() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("kinds.json.gz");

    let mut nested = BTreeMap::new();
    nested.insert("inner".to_string(), PropertyValue::Integer(1));

    let properties = props(&[
        ("null", PropertyValue::Null),
        ("bool", true.into()),
        ("int", i64::MAX.into()),
        ("float", 1.5f64.into()),
        ("nan", f64::NAN.into()),
        ("string", "text".into()),
        ("bytes", PropertyValue::Bytes("AQID".to_string())),
        ("list", vec![PropertyValue::Integer(1), "two".into()].into()),
        ("map", PropertyValue::Map(nested)),
        (
            "date",
            PropertyValue::Temporal {
                kind: TemporalKind::Date,
                value: "2024-01-15".to_string(),
            },
        ),
        (
            "datetime",
            PropertyValue::Temporal {
                kind: TemporalKind::DateTime,
                value: "2024-01-15T10:30:00Z".to_string(),
            },
        ),
        ("duration", PropertyValue::Duration("P14DT16H12M".to_string())),
        (
            "point",
            Point {
                srid: 4326,
                x: 12.5,
                y: 55.6,
                z: None,
            }
            .into(),
        ),
        (
            "point3d",
            Point {
                srid: 4979,
                x: 1.0,
                y: 2.0,
                z: Some(3.0),
            }
            .into(),
        ),
    ]);

    let mut graph = MemoryGraph::new();
    graph.add_node("n", &["All"], properties);
    export_graph(&mut graph, &output).await.unwrap();

    let doc = read_document(&output);
    assert_eq!(
        doc["graph"]["nodes"]["n"]["metadata"],
        json!({
            "null": null,
            "bool": true,
            "int": i64::MAX,
            "float": 1.5,
            "nan": null,
            "string": "text",
            "bytes": "AQID",
            "list": [1, "two"],
            "map": { "inner": 1 },
            "date": "2024-01-15",
            "datetime": "2024-01-15T10:30:00Z",
            "duration": "P14DT16H12M",
            "point": { "srid": 4326, "x": 12.5, "y": 55.6 },
            "point3d": { "srid": 4979, "x": 1.0, "y": 2.0, "z": 3.0 }
        })
    );
}

#[tokio::test]
async fn test_multiple_relationship_types_and_referential_consistency() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("social.json.gz");
    let mut graph = social_graph();

    let stats = small_pages().export_graph(&mut graph, &output).await.unwrap();

    assert_eq!(stats.nodes, 5);
    assert_eq!(stats.relationships, 5);
    assert_eq!(stats.relationship_types, 2);

    let doc = read_document(&output);
    let nodes = doc["graph"]["nodes"].as_object().unwrap();
    let edges = doc["graph"]["edges"].as_array().unwrap();
    assert_eq!(nodes.len(), 5);
    assert_eq!(edges.len(), 5);

    for edge in edges {
        assert!(nodes.contains_key(edge["source"].as_str().unwrap()));
        assert!(nodes.contains_key(edge["target"].as_str().unwrap()));
    }

    let labels: Vec<_> = edges.iter().map(|e| e["label"].as_str().unwrap()).collect();
    assert_eq!(
        labels,
        vec!["KNOWS", "KNOWS", "KNOWS", "WORKS_AT", "WORKS_AT"]
    );
    assert_eq!(edges[0]["metadata"], json!({ "since": 2019 }));
}

#[tokio::test]
async fn test_multi_label_join() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("labels.json.gz");
    let mut graph = social_graph();

    export_graph(&mut graph, &output).await.unwrap();

    let doc = read_document(&output);
    assert_eq!(doc["graph"]["nodes"]["p1"]["label"], "Person;Employee");
    assert_eq!(doc["graph"]["nodes"]["c1"]["label"], "Company");
}

#[tokio::test]
async fn test_export_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let first = dir.path().join("first.json.gz");
    let second = dir.path().join("second.json.gz");

    export_graph(&mut social_graph(), &first).await.unwrap();
    export_graph(&mut social_graph(), &second).await.unwrap();

    assert_eq!(read_document(&first), read_document(&second));
}

#[tokio::test]
async fn test_page_size_does_not_change_output() {
    let dir = TempDir::new().unwrap();
    let paged = dir.path().join("paged.json.gz");
    let whole = dir.path().join("whole.json.gz");

    let stats = small_pages()
        .export_graph(&mut social_graph(), &paged)
        .await
        .unwrap();
    export_graph(&mut social_graph(), &whole).await.unwrap();

    assert!(stats.pages > 3);
    assert_eq!(read_document(&paged), read_document(&whole));
}

#[tokio::test]
async fn test_empty_relationship_type_leaves_no_separator() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("gap.json.gz");
    let mut graph = MemoryGraph::new();
    graph
        .add_node("a", &["A"], Properties::new())
        .add_node("b", &["B"], Properties::new())
        .declare_relationship_type("UNUSED")
        .add_relationship("r1", "LINKS", "a", "b", Properties::new())
        .declare_relationship_type("ALSO_UNUSED");

    let stats = export_graph(&mut graph, &output).await.unwrap();
    assert_eq!(stats.relationship_types, 3);

    let text = read_text(&output);
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    assert!(!compact.contains(",,"));
    assert!(!compact.contains("[,"));
    assert!(!compact.contains(",]"));

    let doc: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(doc["graph"]["edges"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unwritable_output_closes_session() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("missing").join("out.json.gz");
    let mut graph = social_graph();

    let err = export_graph(&mut graph, &output).await.unwrap_err();

    assert!(matches!(err, Error::Io(_)));
    assert!(graph.is_closed());
}

#[tokio::test]
async fn test_invalid_options_close_session() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.json.gz");
    let mut graph = social_graph();
    let exporter = GraphExporter::new(ExportOptions {
        page_size: 0,
        ..Default::default()
    });

    let err = exporter.export_graph(&mut graph, &output).await.unwrap_err();

    assert!(matches!(err, Error::Config(_)));
    assert!(graph.is_closed());
}

/// Serves nodes from a `MemoryGraph`, then fails every relationship query.
struct FailingSession {
    inner: MemoryGraph,
    closes: usize,
}

#[async_trait]
impl GraphSession for FailingSession {
    fn backend(&self) -> &'static str {
        "failing"
    }

    async fn relationship_types(&self) -> Result<Vec<String>> {
        self.inner.relationship_types().await
    }

    async fn node_page(
        &self,
        after: Option<String>,
        limit: usize,
    ) -> Result<ExtractedPage<GraphNode>> {
        self.inner.node_page(after, limit).await
    }

    async fn relationship_page(
        &self,
        rel_type: &str,
        _after: Option<String>,
        _limit: usize,
    ) -> Result<ExtractedPage<GraphRelationship>> {
        Err(Error::Query(format!("cursor for {} was reset", rel_type)))
    }

    async fn close(&mut self) -> Result<()> {
        self.closes += 1;
        self.inner.close().await
    }
}

#[tokio::test]
async fn test_query_failure_closes_session_and_keeps_partial_file() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("partial.json.gz");
    let mut session = FailingSession {
        inner: social_graph(),
        closes: 0,
    };

    let err = export_graph(&mut session, &output).await.unwrap_err();

    assert!(matches!(err, Error::Query(ref msg) if msg.contains("KNOWS")));
    assert_eq!(session.closes, 1);
    assert!(session.inner.is_closed());
    assert!(output.exists());
}
