//! Error types for neo4j-json-io.

use thiserror::Error;

/// Result type alias for export operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while connecting to a graph or exporting it.
#[derive(Error, Debug)]
pub enum Error {
    /// The endpoint is unreachable or answered with a transport-level failure.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The server rejected the supplied credentials.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The database rejected a statement or returned an undecodable result.
    #[error("Query error: {0}")]
    Query(String),

    /// Local file write or compression failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Required command-line arguments are missing.
    #[error("Usage error: {0}")]
    Usage(String),

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parse error.
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Exit code the CLI reports for this error.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Usage(_) => exit_code::USAGE,
            _ => exit_code::EXPORT_FAILED,
        }
    }
}

/// Process exit codes used by the `neo4j-json-io` binary.
pub mod exit_code {
    /// Export finished.
    pub const SUCCESS: u8 = 0;
    /// Export aborted by a connection, query, or IO failure.
    pub const EXPORT_FAILED: u8 = 1;
    /// Required arguments missing; nothing was exported.
    pub const USAGE: u8 = 2;
}
