//! Streaming graph export.
//!
//! The exporter pulls nodes, then relationships type by type, one page at a
//! time from a [`GraphSession`] and writes each entity straight into a
//! gzip-compressed JSON document. Only the current page is ever held in
//! memory.

pub mod writer;

use flate2::write::GzEncoder;
use flate2::Compression;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::ExportOptions;
use crate::connection::GraphSession;
use crate::error::{Error, Result};

pub use writer::DocumentWriter;

type Output = DocumentWriter<BufWriter<GzEncoder<File>>>;

/// Export statistics.
#[derive(Debug, Default, Clone)]
pub struct ExportStats {
    /// Nodes written.
    pub nodes: u64,
    /// Relationships written.
    pub relationships: u64,
    /// Relationship types enumerated (including empty ones).
    pub relationship_types: u64,
    /// Pages fetched from the session.
    pub pages: u64,
    /// Duration in seconds.
    pub duration_secs: f64,
}

impl ExportStats {
    /// Calculate throughput (entities per second).
    #[must_use]
    pub fn throughput(&self) -> f64 {
        if self.duration_secs > 0.0 {
            (self.nodes + self.relationships) as f64 / self.duration_secs
        } else {
            0.0
        }
    }
}

/// Streaming graph exporter.
#[derive(Debug, Clone, Default)]
pub struct GraphExporter {
    options: ExportOptions,
}

impl GraphExporter {
    /// Create an exporter with the given options.
    #[must_use]
    pub fn new(options: ExportOptions) -> Self {
        Self { options }
    }

    /// Export the whole graph behind `session` to `output`.
    ///
    /// The session is closed on every path. On failure the first error is
    /// returned and the partially written file is left in place; it is not
    /// deleted, and its gzip stream may be truncated.
    ///
    /// # Errors
    ///
    /// Returns the first IO, connection or query error encountered.
    pub async fn export_graph(
        &self,
        session: &mut dyn GraphSession,
        output: &Path,
    ) -> Result<ExportStats> {
        let start = Instant::now();
        info!("Exporting graph from {} to {:?}", session.backend(), output);

        let result = self.write_document(&*session, output).await;
        let closed = session.close().await;

        let mut stats = match (result, closed) {
            (Ok(stats), Ok(())) => stats,
            (Ok(_), Err(close_err)) => return Err(close_err),
            (Err(err), Ok(())) => return Err(err),
            (Err(err), Err(close_err)) => {
                warn!("Failed to close session after export error: {}", close_err);
                return Err(err);
            }
        };

        stats.duration_secs = start.elapsed().as_secs_f64();
        info!(
            "Export complete: {} nodes, {} relationships ({} types) in {:.2}s ({:.0} entities/sec)",
            stats.nodes,
            stats.relationships,
            stats.relationship_types,
            stats.duration_secs,
            stats.throughput()
        );

        Ok(stats)
    }

    async fn write_document(
        &self,
        session: &dyn GraphSession,
        output: &Path,
    ) -> Result<ExportStats> {
        self.validate_options()?;
        let mut stats = ExportStats::default();
        let progress = create_progress_bar(self.options.show_progress);

        let file = File::create(output)?;
        let encoder = GzEncoder::new(file, Compression::new(self.options.compression_level));
        let mut doc = DocumentWriter::new(BufWriter::new(encoder));

        doc.begin()?;
        self.write_nodes(session, &mut doc, &mut stats, &progress)
            .await?;

        doc.begin_edges()?;
        let rel_types = session.relationship_types().await?;
        stats.relationship_types = rel_types.len() as u64;
        debug!("Found {} relationship types", rel_types.len());

        for rel_type in &rel_types {
            self.write_edges(session, rel_type, &mut doc, &mut stats, &progress)
                .await?;
        }

        let buffered = doc.finish()?;
        let encoder = buffered.into_inner().map_err(|e| e.into_error())?;
        let file = encoder.finish()?;
        file.sync_all()?;

        progress.finish_with_message(format!(
            "{} nodes, {} edges",
            stats.nodes, stats.relationships
        ));

        Ok(stats)
    }

    fn validate_options(&self) -> Result<()> {
        if self.options.page_size == 0 {
            return Err(Error::Config("page_size must be greater than 0".to_string()));
        }
        if self.options.compression_level > 9 {
            return Err(Error::Config(format!(
                "compression_level must be between 0 and 9, got {}",
                self.options.compression_level
            )));
        }
        Ok(())
    }

    async fn write_nodes(
        &self,
        session: &dyn GraphSession,
        doc: &mut Output,
        stats: &mut ExportStats,
        progress: &ProgressBar,
    ) -> Result<()> {
        let mut offset: Option<String> = None;

        loop {
            let page = session.node_page(offset, self.options.page_size).await?;
            stats.pages += 1;

            for node in &page.items {
                doc.write_node(node)?;
                stats.nodes += 1;
            }
            progress.set_message(format!("{} nodes", stats.nodes));
            progress.tick();

            match page.next_offset {
                Some(next) if page.has_more => offset = Some(next),
                _ => return Ok(()),
            }
        }
    }

    async fn write_edges(
        &self,
        session: &dyn GraphSession,
        rel_type: &str,
        doc: &mut Output,
        stats: &mut ExportStats,
        progress: &ProgressBar,
    ) -> Result<()> {
        let mut offset: Option<String> = None;
        let before = stats.relationships;

        loop {
            let page = session
                .relationship_page(rel_type, offset, self.options.page_size)
                .await?;
            stats.pages += 1;

            for relationship in &page.items {
                doc.write_edge(rel_type, relationship)?;
                stats.relationships += 1;
            }
            progress.set_message(format!(
                "{} nodes, {} edges",
                stats.nodes, stats.relationships
            ));
            progress.tick();

            match page.next_offset {
                Some(next) if page.has_more => offset = Some(next),
                _ => break,
            }
        }

        debug!(
            "Exported {} relationships of type {}",
            stats.relationships - before,
            rel_type
        );
        Ok(())
    }
}

/// Export with default options.
///
/// See [`GraphExporter::export_graph`]; a failed export leaves its partial
/// output file behind.
pub async fn export_graph(session: &mut dyn GraphSession, output: &Path) -> Result<ExportStats> {
    GraphExporter::default().export_graph(session, output).await
}

fn create_progress_bar(visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb
}
