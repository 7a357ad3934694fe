//! neo4j-json-io CLI
//!
//! Exports a whole Neo4j graph into a gzip-compressed JSON file.

// CLI tool - relax pedantic lints for ergonomics
#![allow(clippy::pedantic)]

use clap::{CommandFactory, Parser};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use neo4j_json_io::connection::connect_with_config;
use neo4j_json_io::error::exit_code;
use neo4j_json_io::update::{self, GithubReleaseFeed, ReleaseFeed};
use neo4j_json_io::{Error, ExportConfig, GraphExporter};

#[derive(Parser)]
#[command(name = "neo4j-json-io")]
#[command(author = "BioDWH2 Contributors")]
#[command(version)]
#[command(about = "Export a Neo4j graph into gzip-compressed JSON", long_about = None)]
struct Cli {
    /// Output file path (gzip-compressed JSON)
    #[arg(long, value_name = "FILE")]
    export: Option<PathBuf>,

    /// Graph endpoint, e.g. bolt://localhost:7687
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Username (omit for an unauthenticated connection)
    #[arg(long, env = "NEO4J_USERNAME")]
    username: Option<String>,

    /// Password
    #[arg(long, env = "NEO4J_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Database name
    #[arg(long)]
    database: Option<String>,

    /// Rows fetched per page
    #[arg(long)]
    page_size: Option<usize>,

    /// Configuration file path (flags override its values)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Skip the check for a newer release
    #[arg(long)]
    no_update_check: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let feed = GithubReleaseFeed::new();
    match run(cli, &feed).await {
        Ok(()) => ExitCode::from(exit_code::SUCCESS),
        Err(err) => {
            error!("{:#}", err);
            let code = err
                .downcast_ref::<Error>()
                .map_or(exit_code::EXPORT_FAILED, Error::exit_code);
            if code == exit_code::USAGE {
                eprintln!("{}", Cli::command().render_help());
            }
            ExitCode::from(code)
        }
    }
}

fn init_logging(verbose: bool) -> anyhow::Result<()> {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

async fn run(cli: Cli, feed: &dyn ReleaseFeed) -> anyhow::Result<()> {
    let config = merge_config(cli)?;

    // Runs before validation so that a usage error still reports updates.
    if config.options.check_for_updates {
        if let Some(notice) = update::check_for_update(feed, update::current_version()).await {
            update::log_notice(&notice);
        }
    }
    config.validate()?;

    let output = config
        .output
        .clone()
        .ok_or_else(|| Error::Usage("export argument must be specified".to_string()))?;

    let mut session = connect_with_config(&config).await?;
    let exporter = GraphExporter::new(config.options.clone());
    let stats = exporter.export_graph(session.as_mut(), &output).await?;

    println!("\nExport Complete!");
    println!("   Output:        {}", output.display());
    println!("   Nodes:         {}", stats.nodes);
    println!("   Relationships: {}", stats.relationships);
    println!("   Types:         {}", stats.relationship_types);
    println!("   Duration:      {:.2}s", stats.duration_secs);
    println!("   Throughput:    {:.0} entities/sec", stats.throughput());

    Ok(())
}

/// Merges the optional configuration file with command-line flags.
fn merge_config(cli: Cli) -> neo4j_json_io::Result<ExportConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            ExportConfig::from_file(path)?
        }
        None => ExportConfig::default(),
    };

    if let Some(output) = cli.export {
        config.output = Some(output);
    }
    if let Some(endpoint) = cli.endpoint {
        config.endpoint = Some(endpoint);
    }
    if let Some(username) = cli.username {
        config.username = Some(username);
    }
    if let Some(password) = cli.password {
        config.password = Some(password);
    }
    if let Some(database) = cli.database {
        config.database = database;
    }
    if let Some(page_size) = cli.page_size {
        config.options.page_size = page_size;
    }
    if cli.no_update_check {
        config.options.check_for_updates = false;
    }
    config.options.show_progress = true;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use neo4j_json_io::update::Release;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingFeed {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ReleaseFeed for CountingFeed {
        async fn releases(&self) -> neo4j_json_io::Result<Vec<Release>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    fn usage_error(err: &anyhow::Error) -> bool {
        matches!(err.downcast_ref::<Error>(), Some(Error::Usage(_)))
    }

    #[tokio::test]
    async fn test_update_check_runs_before_usage_error() {
        let feed = CountingFeed::default();
        let cli = Cli::parse_from(["neo4j-json-io"]);

        let err = run(cli, &feed).await.unwrap_err();

        assert!(usage_error(&err));
        assert_eq!(feed.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_update_check_flag_skips_feed() {
        let feed = CountingFeed::default();
        let cli = Cli::parse_from(["neo4j-json-io", "--no-update-check"]);

        let err = run(cli, &feed).await.unwrap_err();

        assert!(usage_error(&err));
        assert_eq!(feed.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_flags_override_config_values() {
        let cli = Cli::parse_from([
            "neo4j-json-io",
            "--export",
            "out.json.gz",
            "-e",
            "bolt://localhost",
            "--database",
            "movies",
            "--page-size",
            "50",
        ]);

        let config = merge_config(cli).unwrap();

        assert_eq!(config.endpoint.as_deref(), Some("bolt://localhost"));
        assert_eq!(config.database, "movies");
        assert_eq!(config.options.page_size, 50);
        assert!(config.validate().is_ok());
    }
}
