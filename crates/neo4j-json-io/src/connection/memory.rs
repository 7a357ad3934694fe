//! In-memory graph session.
//!
//! Holds nodes and relationships in insertion order and serves them through
//! the same paged [`GraphSession`] contract as a live server. Useful for
//! tests, benchmarks, and for embedding the exporter over data that is
//! already in memory.

use async_trait::async_trait;

use crate::connection::GraphSession;
use crate::error::{Error, Result};
use crate::model::{ExtractedPage, GraphNode, GraphRelationship};
use crate::value::Properties;

/// A graph held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryGraph {
    nodes: Vec<GraphNode>,
    relationships: Vec<GraphRelationship>,
    relationship_types: Vec<String>,
    closed: bool,
}

impl MemoryGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node.
    pub fn add_node(
        &mut self,
        id: impl Into<String>,
        labels: &[&str],
        properties: Properties,
    ) -> &mut Self {
        self.nodes.push(GraphNode {
            id: id.into(),
            labels: labels.iter().map(|l| (*l).to_string()).collect(),
            properties,
        });
        self
    }

    /// Adds a relationship; its type is registered on first use.
    pub fn add_relationship(
        &mut self,
        id: impl Into<String>,
        rel_type: &str,
        source: impl Into<String>,
        target: impl Into<String>,
        properties: Properties,
    ) -> &mut Self {
        self.declare_relationship_type(rel_type);
        self.relationships.push(GraphRelationship {
            id: id.into(),
            rel_type: rel_type.to_string(),
            source: source.into(),
            target: target.into(),
            properties,
        });
        self
    }

    /// Registers a relationship type, even one with no relationships.
    pub fn declare_relationship_type(&mut self, rel_type: &str) -> &mut Self {
        if !self.relationship_types.iter().any(|t| t == rel_type) {
            self.relationship_types.push(rel_type.to_string());
        }
        self
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of relationships.
    #[must_use]
    pub fn relationship_count(&self) -> usize {
        self.relationships.len()
    }

    /// Whether [`GraphSession::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(Error::Connection("Session is closed".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Pages over `items`, using the position as resume key.
fn page_of<'a, T: Clone + 'a>(
    items: impl Iterator<Item = &'a T>,
    after: Option<String>,
    limit: usize,
) -> Result<ExtractedPage<T>> {
    let start = match after {
        Some(key) => key
            .parse::<usize>()
            .map_err(|_| Error::Query(format!("Invalid page key '{}'", key)))?,
        None => 0,
    };

    let mut rest = items.skip(start);
    let batch: Vec<T> = rest.by_ref().take(limit).cloned().collect();
    let end = start + batch.len();
    let has_more = batch.len() == limit && rest.next().is_some();

    Ok(ExtractedPage {
        items: batch,
        next_offset: has_more.then(|| end.to_string()),
        has_more,
    })
}

#[async_trait]
impl GraphSession for MemoryGraph {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn relationship_types(&self) -> Result<Vec<String>> {
        self.ensure_open()?;
        Ok(self.relationship_types.clone())
    }

    async fn node_page(
        &self,
        after: Option<String>,
        limit: usize,
    ) -> Result<ExtractedPage<GraphNode>> {
        self.ensure_open()?;
        page_of(self.nodes.iter(), after, limit)
    }

    async fn relationship_page(
        &self,
        rel_type: &str,
        after: Option<String>,
        limit: usize,
    ) -> Result<ExtractedPage<GraphRelationship>> {
        self.ensure_open()?;
        page_of(
            self.relationships.iter().filter(|r| r.rel_type == rel_type),
            after,
            limit,
        )
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MemoryGraph {
        let mut graph = MemoryGraph::new();
        graph
            .add_node("a", &["Person"], Properties::new())
            .add_node("b", &["Person"], Properties::new())
            .add_node("c", &["City"], Properties::new())
            .add_relationship("r1", "KNOWS", "a", "b", Properties::new())
            .add_relationship("r2", "LIVES_IN", "a", "c", Properties::new())
            .add_relationship("r3", "KNOWS", "b", "a", Properties::new());
        graph
    }

    #[tokio::test]
    async fn test_relationship_types_first_seen_order() {
        let mut graph = sample();
        graph.declare_relationship_type("EMPTY").declare_relationship_type("KNOWS");
        assert_eq!(
            graph.relationship_types().await.unwrap(),
            vec!["KNOWS", "LIVES_IN", "EMPTY"]
        );
    }

    #[tokio::test]
    async fn test_node_paging() {
        let graph = sample();
        let first = graph.node_page(None, 2).await.unwrap();
        assert_eq!(first.items.len(), 2);
        assert!(first.has_more);

        let second = graph.node_page(first.next_offset, 2).await.unwrap();
        assert_eq!(second.items.len(), 1);
        assert_eq!(second.items[0].id, "c");
        assert!(!second.has_more);
    }

    #[tokio::test]
    async fn test_exact_page_boundary_has_no_more() {
        let graph = sample();
        let page = graph.node_page(None, 3).await.unwrap();
        assert_eq!(page.items.len(), 3);
        assert!(!page.has_more);
        assert!(page.next_offset.is_none());
    }

    #[tokio::test]
    async fn test_relationship_page_filters_type() {
        let graph = sample();
        let page = graph.relationship_page("KNOWS", None, 10).await.unwrap();
        let ids: Vec<_> = page.items.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r1", "r3"]);
    }

    #[tokio::test]
    async fn test_closed_graph_rejects_queries() {
        let mut graph = sample();
        graph.close().await.unwrap();
        assert!(graph.is_closed());
        assert!(graph.relationship_types().await.is_err());
    }

    #[tokio::test]
    async fn test_invalid_page_key() {
        let graph = sample();
        assert!(matches!(
            graph.node_page(Some("4:db:0".to_string()), 2).await,
            Err(Error::Query(_))
        ));
    }
}
