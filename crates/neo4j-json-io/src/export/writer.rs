//! Streaming writer for the export document.
//!
//! The document layout is fixed:
//!
//! ```text
//! {
//!   "graph": {
//!     "nodes": {
//!       "<id>": { "label": "<labels joined by ;>", "metadata": {...} },
//!       ...
//!     },
//!     "edges": [
//!       { "id": ..., "source": ..., "target": ..., "label": ..., "metadata": {...} },
//!       ...
//!     ]
//!   }
//! }
//! ```
//!
//! The scaffold is written literally; every id, label and metadata object is
//! written through `serde_json`, so quotes, backslashes and control
//! characters in graph data are always escaped.

use serde::Serialize;
use std::io::{self, Write};

use crate::model::{GraphNode, GraphRelationship};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Start,
    Nodes,
    Edges,
}

/// Writes the export document entry by entry.
pub struct DocumentWriter<W: Write> {
    out: W,
    section: Section,
    first: bool,
}

impl<W: Write> DocumentWriter<W> {
    /// Wraps `out`. Nothing is written until [`begin`](Self::begin).
    pub fn new(out: W) -> Self {
        Self {
            out,
            section: Section::Start,
            first: true,
        }
    }

    /// Writes the scaffold up to and including the opening of `nodes`.
    pub fn begin(&mut self) -> io::Result<()> {
        debug_assert_eq!(self.section, Section::Start);
        self.out.write_all(b"{\n  \"graph\": {\n    \"nodes\": {\n")?;
        self.section = Section::Nodes;
        self.first = true;
        Ok(())
    }

    /// Appends one entry to the `nodes` object.
    pub fn write_node(&mut self, node: &GraphNode) -> io::Result<()> {
        debug_assert_eq!(self.section, Section::Nodes);
        self.separator()?;
        self.out.write_all(b"      ")?;
        self.json(&node.id)?;
        self.out.write_all(b": {\n        \"label\": ")?;
        self.json(&node.joined_labels())?;
        self.out.write_all(b",\n        \"metadata\": ")?;
        self.json(&node.properties)?;
        self.out.write_all(b"\n      }")
    }

    /// Closes `nodes` and opens the `edges` array.
    pub fn begin_edges(&mut self) -> io::Result<()> {
        debug_assert_eq!(self.section, Section::Nodes);
        self.close_entries()?;
        self.out.write_all(b"    },\n    \"edges\": [\n")?;
        self.section = Section::Edges;
        self.first = true;
        Ok(())
    }

    /// Appends one entry to the `edges` array, labelled with `label`.
    pub fn write_edge(&mut self, label: &str, relationship: &GraphRelationship) -> io::Result<()> {
        debug_assert_eq!(self.section, Section::Edges);
        self.separator()?;
        self.out.write_all(b"      {\n        \"id\": ")?;
        self.json(&relationship.id)?;
        self.out.write_all(b",\n        \"source\": ")?;
        self.json(&relationship.source)?;
        self.out.write_all(b",\n        \"target\": ")?;
        self.json(&relationship.target)?;
        self.out.write_all(b",\n        \"label\": ")?;
        self.json(label)?;
        self.out.write_all(b",\n        \"metadata\": ")?;
        self.json(&relationship.properties)?;
        self.out.write_all(b"\n      }")
    }

    /// Closes `edges`, `graph` and the document, flushes, and hands back the
    /// underlying writer.
    pub fn finish(mut self) -> io::Result<W> {
        debug_assert_eq!(self.section, Section::Edges);
        self.close_entries()?;
        self.out.write_all(b"    ]\n  }\n}\n")?;
        self.out.flush()?;
        Ok(self.out)
    }

    fn separator(&mut self) -> io::Result<()> {
        if self.first {
            self.first = false;
            Ok(())
        } else {
            self.out.write_all(b",\n")
        }
    }

    fn close_entries(&mut self) -> io::Result<()> {
        if self.first {
            Ok(())
        } else {
            self.out.write_all(b"\n")
        }
    }

    fn json<T: Serialize + ?Sized>(&mut self, value: &T) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, value).map_err(io::Error::from)
    }
}
