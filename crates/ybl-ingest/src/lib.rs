//! YBL Ingest Library
//!
//! Loads the tablet server logs of a YugabyteDB support bundle into a SQL
//! table, one row per structured log line.
//!
//! # Pipeline
//!
//! - **[`archive`]**: expands nested `.tar.gz` / `.tgz` / `.gz` archives in place
//! - **[`selector`]**: picks `yb-tserver` INFO logs by file name
//! - **[`server_name`]**: derives the server name from a log file name
//! - **[`parser`]**: turns glog-formatted lines into [`LogRecord`]s
//! - **[`batch`]** / **[`sink`]**: commit records in batches to PostgreSQL or SQLite
//! - **[`orchestrator`]**: drives a whole run and reports an [`IngestSummary`]
//!
//! # Example
//!
//! ```no_run
//! use ybl_ingest::{IngestConfig, IngestOrchestrator, SinkConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = IngestConfig::new("./bundle", SinkConfig::new("sqlite://logs.db"));
//!     let summary = IngestOrchestrator::new(config)?.run().await?;
//!     println!("{} rows written", summary.records_written);
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod batch;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod parser;
pub mod selector;
pub mod server_name;
pub mod sink;

pub use config::{IngestConfig, SelectionConfig, SinkConfig};
pub use error::{IngestError, Result};
pub use models::{LogLevel, LogRecord};
pub use orchestrator::{IngestOrchestrator, IngestSummary};
