// Export tool - pedantic lints relaxed for CLI ergonomics
#![allow(clippy::pedantic)]

//! # neo4j-json-io
//!
//! `neo4j-json-io` is a CLI tool and library for exporting a complete Neo4j
//! graph into a single gzip-compressed JSON document.
//!
//! ## Output
//!
//! ```json
//! {
//!   "graph": {
//!     "nodes": { "<id>": { "label": "Person;Employee", "metadata": { ... } } },
//!     "edges": [ { "id": "...", "source": "...", "target": "...", "label": "KNOWS", "metadata": { ... } } ]
//!   }
//! }
//! ```
//!
//! ## Supported Endpoints
//!
//! | Scheme | Transport | Notes |
//! |--------|-----------|-------|
//! | `bolt://`, `neo4j://` | HTTP | Port 7687 (or none) maps to 7474 |
//! | `bolt+s://`, `neo4j+s://` | HTTPS | Port 7687 (or none) maps to 7473 |
//! | `http://`, `https://` | as given | Query API v2 (Neo4j 5.19+) |
//!
//! A Bolt address on any other port is rejected: pass the server's HTTP
//! address instead.
//!
//! ## Quick Start
//!
//! ```bash
//! neo4j-json-io --export graph.json.gz -e bolt://localhost:7687 --username neo4j --password secret
//!
//! # From a configuration file
//! neo4j-json-io --config export.yaml
//! ```
//!
//! ## Configuration Example
//!
//! ```yaml
//! endpoint: bolt://localhost:7687
//! username: neo4j
//! password: secret
//! database: neo4j
//! output: ./graph.json.gz
//!
//! options:
//!   page_size: 1000
//!   compression_level: 6
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod connection;
pub mod error;
pub mod export;
pub mod model;
pub mod update;
pub mod value;

pub use config::{Credentials, ExportConfig, ExportOptions};
pub use connection::{connect, GraphSession, MemoryGraph, Neo4jHttpSession};
pub use error::{Error, Result};
pub use export::{export_graph, ExportStats, GraphExporter};
pub use model::{ExtractedPage, GraphNode, GraphRelationship};
pub use value::{Point, Properties, PropertyValue, TemporalKind};
