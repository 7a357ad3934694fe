//! Neo4j session over the HTTP Query API.
//!
//! Statements are posted to `/db/{database}/query/v2` and answered in the
//! typed JSON format (`application/vnd.neo4j.query`), which keeps temporal,
//! spatial and 64-bit integer values distinguishable. Each request is an
//! auto-commit transaction. A node or relationship scan is one unbounded
//! statement whose response is read row by row through a [`ResultCursor`];
//! pages are cut from that single cursor.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::Credentials;
use tokio::sync::Mutex;

use crate::connection::common::{
    create_http_client, handle_http_error, quote_identifier, resolve_endpoint, ServerError,
};
use crate::connection::cursor::ResultCursor;
use crate::connection::GraphSession;
use crate::error::{Error, Result};
use crate::model::{ExtractedPage, GraphNode, GraphRelationship};
use crate::value::{decode_properties, PropertyValue};

/// Media type of typed JSON responses.
pub const TYPED_JSON: &str = "application/vnd.neo4j.query";

const PING_QUERY: &str = "RETURN 1 AS ok";

const RELATIONSHIP_TYPES_QUERY: &str =
    "CALL db.relationshipTypes() YIELD relationshipType RETURN relationshipType";

const NODES_QUERY: &str = "MATCH (n) RETURN n";

/// Request body of the Query API.
#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    statement: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<Value>,
}

/// Response body of the Query API.
#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    data: Option<QueryData>,
    #[serde(default)]
    errors: Vec<ServerError>,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    #[allow(dead_code)]
    #[serde(default)]
    fields: Vec<String>,
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// `_value` of a typed `Node`.
#[derive(Debug, Deserialize)]
struct NodeBody {
    #[serde(rename = "_element_id")]
    element_id: String,
    #[serde(rename = "_labels", default)]
    labels: Vec<String>,
    #[serde(rename = "_properties", default)]
    properties: Value,
}

/// `_value` of a typed `Relationship`.
#[derive(Debug, Deserialize)]
struct RelationshipBody {
    #[serde(rename = "_element_id")]
    element_id: String,
    #[serde(rename = "_start_node_element_id")]
    start_node_element_id: String,
    #[serde(rename = "_end_node_element_id")]
    end_node_element_id: String,
    #[serde(rename = "_type")]
    rel_type: String,
    #[serde(rename = "_properties", default)]
    properties: Value,
}

/// Neo4j session backed by the HTTP Query API.
pub struct Neo4jHttpSession {
    base_url: String,
    database: String,
    credentials: Option<Credentials>,
    client: Client,
    connected: bool,
    cursor: Mutex<Option<ResultCursor>>,
}

impl Neo4jHttpSession {
    /// Creates a session for `endpoint`. No request is sent until
    /// [`connect`](Self::connect).
    pub fn new(endpoint: &str, credentials: Option<Credentials>, database: &str) -> Result<Self> {
        let base = resolve_endpoint(endpoint)?;
        Ok(Self {
            base_url: base.as_str().trim_end_matches('/').to_string(),
            database: database.to_string(),
            credentials,
            client: create_http_client(),
            connected: false,
            cursor: Mutex::new(None),
        })
    }

    /// Resolved HTTP base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Pings the server so that reachability and credentials are checked
    /// before any output is written.
    pub async fn connect(&mut self) -> Result<()> {
        self.run_query(PING_QUERY, None).await?;
        self.connected = true;
        Ok(())
    }

    /// Builds the Query API URL for the configured database.
    fn build_query_url(&self) -> String {
        format!("{}/db/{}/query/v2", self.base_url, self.database)
    }

    /// Makes an authenticated request.
    fn build_request(&self, url: &str) -> reqwest::RequestBuilder {
        let req = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .header("Accept", TYPED_JSON);

        match &self.credentials {
            Some(creds) => req.basic_auth(&creds.username, Some(&creds.password)),
            None => req,
        }
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.connected {
            Ok(())
        } else {
            Err(Error::Connection("Session is not connected".to_string()))
        }
    }

    /// Sends one statement and returns the successful response, body unread.
    async fn send_statement(
        &self,
        statement: &str,
        parameters: Option<Value>,
    ) -> Result<reqwest::Response> {
        let url = self.build_query_url();
        debug!("POST {}: {}", url, statement);

        let response = self
            .build_request(&url)
            .json(&QueryRequest {
                statement,
                parameters,
            })
            .send()
            .await
            .map_err(|e| Error::Connection(format!("Neo4j request to {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(handle_http_error(status.as_u16(), &body));
        }

        Ok(response)
    }

    /// Runs one statement and returns all of its result rows.
    async fn run_query(
        &self,
        statement: &str,
        parameters: Option<Value>,
    ) -> Result<Vec<Vec<Value>>> {
        let response = self.send_statement(statement, parameters).await?;
        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|e| Error::Query(format!("Failed to parse query response: {}", e)))?;

        if let Some(err) = parsed.errors.into_iter().next() {
            return Err(err.into_error());
        }

        parsed
            .data
            .map(|d| d.values)
            .ok_or_else(|| Error::Query("Query response contains no data".to_string()))
    }

    /// Cuts the next page from the scan of `statement`.
    ///
    /// `after == None` starts the scan, replacing any open cursor. Otherwise
    /// `after` must be the `next_offset` of the previous page of the same
    /// scan. The cursor is dropped once the scan is complete.
    async fn fetch_page<T>(
        &self,
        statement: &str,
        after: Option<String>,
        limit: usize,
        decode: fn(Value) -> Result<T>,
        key: fn(&T) -> &str,
    ) -> Result<ExtractedPage<T>> {
        self.ensure_connected()?;
        let mut guard = self.cursor.lock().await;

        if after.is_none() {
            let response = self.send_statement(statement, None).await?;
            *guard = Some(ResultCursor::new(statement, response));
        }
        let cursor = guard
            .as_mut()
            .ok_or_else(|| Error::Query("No open scan to continue".to_string()))?;
        if cursor.statement() != statement || cursor.resume_key != after {
            return Err(Error::Query(format!(
                "Page key {:?} does not continue the open scan",
                after
            )));
        }

        let mut items = Vec::new();
        while items.len() < limit {
            match cursor.next_row().await? {
                Some(row) => items.push(decode(first_column(row)?)?),
                None => break,
            }
        }

        let has_more = limit > 0 && items.len() == limit && cursor.has_next().await?;
        let next_offset = if has_more {
            items.last().map(|item| key(item).to_string())
        } else {
            None
        };

        if has_more {
            cursor.resume_key = next_offset.clone();
        } else {
            *guard = None;
        }

        Ok(ExtractedPage {
            items,
            next_offset,
            has_more,
        })
    }
}

fn first_column(row: Vec<Value>) -> Result<Value> {
    row.into_iter()
        .next()
        .ok_or_else(|| Error::Query("Result row has no columns".to_string()))
}

/// Splits a typed value into its `_value`, checking the `$type` tag.
fn typed_body(value: Value, expected: &str) -> Result<Value> {
    match value {
        Value::Object(mut map) => {
            let type_name = map.get("$type").and_then(Value::as_str).unwrap_or_default();
            if type_name != expected {
                return Err(Error::Query(format!(
                    "Expected a {} value, got '{}'",
                    expected, type_name
                )));
            }
            Ok(map.remove("_value").unwrap_or(Value::Null))
        }
        other => Err(Error::Query(format!(
            "Expected a {} value, got {}",
            expected, other
        ))),
    }
}

fn decode_node(value: Value) -> Result<GraphNode> {
    let body: NodeBody = serde_json::from_value(typed_body(value, "Node")?)
        .map_err(|e| Error::Query(format!("Malformed node: {}", e)))?;
    Ok(GraphNode {
        id: body.element_id,
        labels: body.labels,
        properties: decode_properties(&body.properties)?,
    })
}

fn decode_relationship(value: Value) -> Result<GraphRelationship> {
    let body: RelationshipBody = serde_json::from_value(typed_body(value, "Relationship")?)
        .map_err(|e| Error::Query(format!("Malformed relationship: {}", e)))?;
    Ok(GraphRelationship {
        id: body.element_id,
        rel_type: body.rel_type,
        source: body.start_node_element_id,
        target: body.end_node_element_id,
        properties: decode_properties(&body.properties)?,
    })
}

fn decode_type_name(value: Value) -> Result<String> {
    match value {
        Value::String(name) => Ok(name),
        typed => match PropertyValue::from_typed_json(&typed)? {
            PropertyValue::String(name) => Ok(name),
            other => Err(Error::Query(format!(
                "Relationship type is not a string: {:?}",
                other
            ))),
        },
    }
}

fn relationship_query(rel_type: &str) -> String {
    format!("MATCH ()-[r:{}]->() RETURN r", quote_identifier(rel_type))
}

#[async_trait]
impl GraphSession for Neo4jHttpSession {
    fn backend(&self) -> &'static str {
        "neo4j-http"
    }

    async fn relationship_types(&self) -> Result<Vec<String>> {
        self.ensure_connected()?;
        self.run_query(RELATIONSHIP_TYPES_QUERY, None)
            .await?
            .into_iter()
            .map(|row| decode_type_name(first_column(row)?))
            .collect()
    }

    async fn node_page(
        &self,
        after: Option<String>,
        limit: usize,
    ) -> Result<ExtractedPage<GraphNode>> {
        self.fetch_page(NODES_QUERY, after, limit, decode_node, |n| &n.id)
            .await
    }

    async fn relationship_page(
        &self,
        rel_type: &str,
        after: Option<String>,
        limit: usize,
    ) -> Result<ExtractedPage<GraphRelationship>> {
        let statement = relationship_query(rel_type);
        self.fetch_page(&statement, after, limit, decode_relationship, |r| &r.id)
            .await
    }

    async fn close(&mut self) -> Result<()> {
        if self.connected {
            debug!("Closing session to {}", self.base_url);
        }
        self.cursor.get_mut().take();
        self.connected = false;
        Ok(())
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
