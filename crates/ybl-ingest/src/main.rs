//! YBL Ingest - support bundle log loader

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};
use ybl_common::logging::{init_logging, LogConfig, LogLevel};
use ybl_ingest::config::{
    DEFAULT_BATCH_SIZE, DEFAULT_EXCLUDE_MARKER, DEFAULT_SERVER_MARKER, DEFAULT_SINK_URL,
    DEFAULT_STREAM_MARKER, DEFAULT_TABLE_NAME,
};
use ybl_ingest::{IngestConfig, IngestOrchestrator, SelectionConfig, SinkConfig};

#[derive(Parser, Debug)]
#[command(name = "ybl-ingest")]
#[command(author, version, about = "Load YugabyteDB support bundle logs into a SQL table")]
struct Cli {
    /// Root directory of the extracted (or still compressed) support bundle
    #[arg(env = "YBL_ROOT")]
    root: PathBuf,

    /// Destination database URL (postgres://... or sqlite://...)
    #[arg(short, long, env = "DATABASE_URL", default_value = DEFAULT_SINK_URL)]
    database_url: String,

    /// Records per committed batch
    #[arg(short, long, env = "YBL_BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Destination table name
    #[arg(short, long, env = "YBL_TABLE", default_value = DEFAULT_TABLE_NAME)]
    table: String,

    /// Files parsed concurrently (1 keeps batches spanning files)
    #[arg(short, long, env = "YBL_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// File name marker of the server role
    #[arg(long, env = "YBL_SERVER_MARKER", default_value = DEFAULT_SERVER_MARKER)]
    server_marker: String,

    /// File name marker of the log stream
    #[arg(long, env = "YBL_STREAM_MARKER", default_value = DEFAULT_STREAM_MARKER)]
    stream_marker: String,

    /// File name marker excluding a file (empty disables)
    #[arg(long, env = "YBL_EXCLUDE_MARKER", default_value = DEFAULT_EXCLUDE_MARKER)]
    exclude_marker: String,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn ingest_config(&self) -> IngestConfig {
        IngestConfig::new(&self.root, SinkConfig::new(&self.database_url))
            .with_batch_size(self.batch_size)
            .with_table_name(&self.table)
            .with_concurrency(self.concurrency)
            .with_selection(SelectionConfig {
                server_marker: self.server_marker.clone(),
                stream_marker: self.stream_marker.clone(),
                exclude_marker: self.exclude_marker.clone(),
            })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence over flags
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("ybl-ingest")
        .filter_directives("sqlx=warn")
        .build()
        .merge_env()?;

    let _guard = init_logging(&log_config)?;

    let orchestrator = IngestOrchestrator::new(cli.ingest_config())?;
    info!(
        root = %cli.root.display(),
        table = %cli.table,
        batch_size = cli.batch_size,
        "Ingesting support bundle"
    );

    let summary = match orchestrator.run().await {
        Ok(summary) => summary,
        Err(e) => {
            error!(error = %e, "Ingestion failed");
            return Err(e.into());
        },
    };

    if cli.json {
        let json = serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?;
        println!("{json}");
    }

    Ok(())
}
