//! Connection management for graph sources.
//!
//! A [`GraphSession`] is the query-execution handle the exporter consumes. It
//! exposes exactly the three query shapes an export needs. Node and
//! relationship scans are handed out page by page so that no result set is
//! ever materialized in full.

pub mod common;
pub mod cursor;
pub mod http;
pub mod memory;

use async_trait::async_trait;
use tracing::info;

use crate::config::{Credentials, ExportConfig};
use crate::error::{Error, Result};
use crate::model::{ExtractedPage, GraphNode, GraphRelationship};

pub use http::Neo4jHttpSession;
pub use memory::MemoryGraph;

/// Trait for graph sessions.
///
/// Implement this trait to export from a new kind of graph source.
#[async_trait]
pub trait GraphSession: Send + Sync {
    /// Get the backend name.
    fn backend(&self) -> &'static str;

    /// Distinct relationship type names, in the order the source returns them.
    async fn relationship_types(&self) -> Result<Vec<String>>;

    /// Fetch the next page of nodes.
    ///
    /// # Arguments
    ///
    /// * `after` - `next_offset` of the previous page, `None` to start the scan
    /// * `limit` - Maximum number of nodes to return
    async fn node_page(&self, after: Option<String>, limit: usize)
        -> Result<ExtractedPage<GraphNode>>;

    /// Fetch the next page of relationships of one type.
    async fn relationship_page(
        &self,
        rel_type: &str,
        after: Option<String>,
        limit: usize,
    ) -> Result<ExtractedPage<GraphRelationship>>;

    /// Release the session. Calling it twice is a no-op.
    async fn close(&mut self) -> Result<()>;
}

/// Connect to a graph endpoint.
///
/// `credentials` of `None` opens an unauthenticated session. The returned
/// session has already completed a round trip with the server.
///
/// # Errors
///
/// `Error::Config` for an unusable endpoint, `Error::Connection` when the
/// server cannot be reached, `Error::Authentication` when it rejects the
/// credentials.
pub async fn connect(
    endpoint: &str,
    credentials: Option<Credentials>,
    database: &str,
) -> Result<Box<dyn GraphSession>> {
    let mut session = Neo4jHttpSession::new(endpoint, credentials, database)?;
    session.connect().await?;
    info!(
        "Connected to {} (database '{}')",
        session.base_url(),
        database
    );
    Ok(Box::new(session))
}

/// Connect using a validated [`ExportConfig`].
pub async fn connect_with_config(config: &ExportConfig) -> Result<Box<dyn GraphSession>> {
    let endpoint = config
        .endpoint
        .as_deref()
        .ok_or_else(|| Error::Usage("endpoint must be specified".to_string()))?;
    connect(endpoint, config.credentials(), &config.database).await
}
