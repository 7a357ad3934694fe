//! Graph entities pulled from a session, one page at a time.

use crate::value::Properties;

/// A node as returned by a node scan.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    /// Element id, unique within the source graph.
    pub id: String,
    /// Labels in the order the server reported them.
    pub labels: Vec<String>,
    /// Node properties.
    pub properties: Properties,
}

impl GraphNode {
    /// Labels joined with `;`, the form used in the export document.
    #[must_use]
    pub fn joined_labels(&self) -> String {
        self.labels.join(";")
    }
}

/// A relationship as returned by a per-type relationship scan.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphRelationship {
    /// Element id, unique within the source graph.
    pub id: String,
    /// Relationship type name.
    pub rel_type: String,
    /// Element id of the start node.
    pub source: String,
    /// Element id of the end node.
    pub target: String,
    /// Relationship properties.
    pub properties: Properties,
}

/// One page cut from a scan.
#[derive(Debug, Clone)]
pub struct ExtractedPage<T> {
    /// Entities in this page, in cursor order.
    pub items: Vec<T>,
    /// Key that continues the scan after this page; `None` on the last page.
    pub next_offset: Option<String>,
    /// Whether another page follows.
    pub has_more: bool,
}
