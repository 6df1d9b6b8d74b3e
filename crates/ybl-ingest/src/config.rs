//! Ingestion configuration
//!
//! Everything a run needs is carried in [`IngestConfig`] and handed to the
//! orchestrator at construction; there are no process-wide settings.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{IngestError, Result};

/// Default number of records per committed batch
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Largest accepted batch; one batch is held in memory and committed as one transaction
pub const MAX_BATCH_SIZE: usize = 1_000_000;

/// Default destination table
pub const DEFAULT_TABLE_NAME: &str = "logs";

/// Default sink: a SQLite file next to the working directory
pub const DEFAULT_SINK_URL: &str = "sqlite://logs.db";

pub const DEFAULT_MAX_CONNECTIONS: u32 = 4;

pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// File name marker of the tablet server role
pub const DEFAULT_SERVER_MARKER: &str = "yb-tserver";

/// File name marker of the INFO log stream
pub const DEFAULT_STREAM_MARKER: &str = "INFO";

/// File name marker of editor swap files
pub const DEFAULT_EXCLUDE_MARKER: &str = "swp";

/// Destination store connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// `postgres://...` or `sqlite://...`
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SINK_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }
}

impl SinkConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}

/// File name markers deciding which files are ingested
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    pub server_marker: String,
    pub stream_marker: String,
    pub exclude_marker: String,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            server_marker: DEFAULT_SERVER_MARKER.to_string(),
            stream_marker: DEFAULT_STREAM_MARKER.to_string(),
            exclude_marker: DEFAULT_EXCLUDE_MARKER.to_string(),
        }
    }
}

/// Full configuration of one ingestion run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Root of the support bundle
    pub root_path: PathBuf,

    pub sink: SinkConfig,

    /// Records per committed batch
    pub batch_size: usize,

    /// Destination table name
    pub table_name: String,

    /// Files parsed concurrently (1 = sequential, one batch spanning files)
    pub concurrency: usize,

    pub selection: SelectionConfig,
}

impl IngestConfig {
    pub fn new(root_path: impl Into<PathBuf>, sink: SinkConfig) -> Self {
        Self {
            root_path: root_path.into(),
            sink,
            batch_size: DEFAULT_BATCH_SIZE,
            table_name: DEFAULT_TABLE_NAME.to_string(),
            concurrency: 1,
            selection: SelectionConfig::default(),
        }
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    pub fn with_table_name(mut self, table: impl Into<String>) -> Self {
        self.table_name = table.into();
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_selection(mut self, selection: SelectionConfig) -> Self {
        self.selection = selection;
        self
    }

    /// Reject settings that would make the run meaningless or unsafe
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(IngestError::Config("batch_size must be greater than 0".to_string()));
        }
        if self.batch_size > MAX_BATCH_SIZE {
            return Err(IngestError::Config(format!(
                "batch_size must be at most {MAX_BATCH_SIZE}, got {}",
                self.batch_size
            )));
        }
        if self.concurrency == 0 {
            return Err(IngestError::Config("concurrency must be greater than 0".to_string()));
        }
        if !is_valid_identifier(&self.table_name) {
            return Err(IngestError::Config(format!(
                "table name '{}' is not a plain SQL identifier",
                self.table_name
            )));
        }
        if self.selection.server_marker.is_empty() || self.selection.stream_marker.is_empty() {
            return Err(IngestError::Config("selection markers must not be empty".to_string()));
        }
        Ok(())
    }
}

/// The table name is spliced into SQL text, so only `[A-Za-z_][A-Za-z0-9_]*` is allowed
fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {},
        _ => return false,
    }
    name.len() <= 63 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
