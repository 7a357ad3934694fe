//! Common utilities shared by graph sessions.
//!
//! This module provides HTTP client creation, endpoint resolution, Cypher
//! identifier quoting, and mapping of server error responses onto the crate's
//! error taxonomy.

use crate::error::{Error, Result};
use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;

/// Longest wait for a single read; a scan may stream far longer in total.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Default Bolt port; the only Bolt port that resolves to an HTTP port.
pub const BOLT_PORT: u16 = 7687;

/// Default Neo4j HTTP port.
pub const HTTP_PORT: u16 = 7474;

/// Default Neo4j HTTPS port.
pub const HTTPS_PORT: u16 = 7473;

/// Creates a configured HTTP client with read timeout.
#[must_use]
pub fn create_http_client() -> Client {
    Client::builder()
        .read_timeout(DEFAULT_TIMEOUT)
        .connect_timeout(Duration::from_secs(10))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Resolves a user-supplied endpoint to the HTTP base URL of the server.
///
/// `http`/`https` endpoints are used as given. Bolt-style schemes are mapped
/// onto the default HTTP(S) connector of the same host: `bolt://` and
/// `neo4j://` to `http://host:7474`, their `+s`/`+ssc` variants to
/// `https://host:7473`. A Bolt endpoint on any port other than 7687 is
/// rejected, since its HTTP connector cannot be inferred.
pub fn resolve_endpoint(endpoint: &str) -> Result<Url> {
    let url = Url::parse(endpoint.trim())
        .map_err(|e| Error::Config(format!("Invalid endpoint '{}': {}", endpoint, e)))?;

    let (scheme, default_port) = match url.scheme() {
        "http" | "https" => return Ok(url),
        "bolt" | "neo4j" => ("http", HTTP_PORT),
        "bolt+s" | "bolt+ssc" | "neo4j+s" | "neo4j+ssc" => ("https", HTTPS_PORT),
        other => {
            return Err(Error::Config(format!(
                "Unsupported endpoint scheme '{}' in '{}'. Allowed: bolt, neo4j, http, https",
                other, endpoint
            )))
        }
    };

    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| Error::Config(format!("Endpoint '{}' has no host", endpoint)))?;
    if let Some(port) = url.port().filter(|p| *p != BOLT_PORT) {
        return Err(Error::Config(format!(
            "Bolt endpoint '{}' uses port {}; its HTTP connector is unknown. \
             Pass the server's {}:// address instead",
            endpoint, port, scheme
        )));
    }

    Url::parse(&format!("{}://{}:{}", scheme, host, default_port))
        .map_err(|e| Error::Config(format!("Invalid endpoint '{}': {}", endpoint, e)))
}

/// Quotes a label or relationship type for use inside a Cypher pattern.
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Error entry of a Neo4j error response.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerError {
    /// Status code, e.g. `Neo.ClientError.Statement.SyntaxError`.
    #[serde(default)]
    pub code: String,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
}

impl ServerError {
    /// Maps a Neo4j status code onto the error taxonomy.
    #[must_use]
    pub fn into_error(self) -> Error {
        if self.code.starts_with("Neo.ClientError.Security") {
            Error::Authentication(format!("{}: {}", self.code, self.message))
        } else if self.code.starts_with("Neo.TransientError")
            || self.code.starts_with("Neo.DatabaseError")
        {
            Error::Connection(format!("{}: {}", self.code, self.message))
        } else {
            Error::Query(format!("{}: {}", self.code, self.message))
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<ServerError>,
}

/// Handles HTTP error responses and returns appropriate errors.
pub fn handle_http_error(status_code: u16, body: &str) -> Error {
    if matches!(status_code, 401 | 403) {
        return Error::Authentication(format!("Neo4j rejected credentials ({}): {}", status_code, body));
    }

    let server_error = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.errors.into_iter().next());

    match (status_code, server_error) {
        (_, Some(err)) => err.into_error(),
        (404, None) => Error::Connection(format!(
            "Neo4j Query API not found (404); it requires Neo4j 5.19 or newer. \
             Check the endpoint and database name: {}",
            body
        )),
        (400..=499, None) => Error::Query(format!("Neo4j error {}: {}", status_code, body)),
        _ => Error::Connection(format!("Neo4j error {}: {}", status_code, body)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_bolt_default_port() {
        let url = resolve_endpoint("bolt://localhost:7687").unwrap();
        assert_eq!(url.as_str(), "http://localhost:7474/");
    }

    #[test]
    fn test_resolve_neo4j_without_port() {
        let url = resolve_endpoint("neo4j://graph.example.org").unwrap();
        assert_eq!(url.as_str(), "http://graph.example.org:7474/");
    }

    #[test]
    fn test_resolve_secure_bolt() {
        let url = resolve_endpoint("neo4j+s://graph.example.org:7687").unwrap();
        assert_eq!(url.as_str(), "https://graph.example.org:7473/");
    }

    #[test]
    fn test_resolve_bolt_custom_port_rejected() {
        for endpoint in ["bolt://db.example.org:17687", "neo4j://db.example.org:7688"] {
            let err = resolve_endpoint(endpoint).unwrap_err();
            assert!(
                matches!(err, Error::Config(ref msg) if msg.contains("http://")),
                "{}",
                endpoint
            );
        }
        assert!(matches!(
            resolve_endpoint("bolt+s://db.example.org:9999"),
            Err(Error::Config(ref msg)) if msg.contains("https://")
        ));
    }

    #[test]
    fn test_resolve_http_custom_port_kept() {
        let url = resolve_endpoint("http://localhost:17474").unwrap();
        assert_eq!(url.as_str(), "http://localhost:17474/");
    }

    #[test]
    fn test_handle_http_error_missing_query_api() {
        let err = handle_http_error(404, "");
        assert!(matches!(err, Error::Connection(ref msg) if msg.contains("5.19")));
    }

    #[test]
    fn test_resolve_http_unchanged() {
        let url = resolve_endpoint("https://db.example.org:8443/").unwrap();
        assert_eq!(url.as_str(), "https://db.example.org:8443/");
    }

    #[test]
    fn test_resolve_invalid_scheme() {
        assert!(matches!(
            resolve_endpoint("ftp://files.example.com"),
            Err(Error::Config(_))
        ));
        assert!(matches!(resolve_endpoint("not a url"), Err(Error::Config(_))));
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("KNOWS"), "`KNOWS`");
        assert_eq!(quote_identifier("HAS SPACE"), "`HAS SPACE`");
        assert_eq!(quote_identifier("odd`name"), "`odd``name`");
    }

    #[test]
    fn test_handle_http_error_auth() {
        let err = handle_http_error(401, "unauthorized");
        assert!(matches!(err, Error::Authentication(_)));
    }

    #[test]
    fn test_handle_http_error_syntax() {
        let body = r#"{"errors":[{"code":"Neo.ClientError.Statement.SyntaxError","message":"Invalid input"}]}"#;
        let err = handle_http_error(400, body);
        assert!(matches!(err, Error::Query(ref msg) if msg.contains("SyntaxError")));
    }

    #[test]
    fn test_handle_http_error_security_code() {
        let body = r#"{"errors":[{"code":"Neo.ClientError.Security.Unauthorized","message":"bad"}]}"#;
        let err = handle_http_error(400, body);
        assert!(matches!(err, Error::Authentication(_)));
    }

    #[test]
    fn test_handle_http_error_server() {
        let err = handle_http_error(503, "service unavailable");
        assert!(matches!(err, Error::Connection(_)));
    }

    #[test]
    fn test_create_http_client() {
        let client = create_http_client();
        assert!(client.get("http://example.com").build().is_ok());
    }
}
