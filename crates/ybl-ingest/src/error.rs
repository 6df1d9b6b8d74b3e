//! Error types for the ingestion pipeline
//!
//! Per-file conditions (`Archive`, `FilenameFormat`, `FileAccess`) are
//! logged and skipped by the orchestrator. Sink and configuration errors are
//! fatal and end the run.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for ingestion operations
pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Error, Debug)]
pub enum IngestError {
    /// Corrupt, truncated, or unreadable archive
    #[error("Failed to expand archive {}: {message}", .path.display())]
    Archive { path: PathBuf, message: String },

    /// File name has too few dot-separated components to carry a server name
    #[error("Log file name format is incorrect for {}", .0.display())]
    FilenameFormat(PathBuf),

    /// File vanished or became unreadable after selection
    #[error("Failed to read log file {}: {source}", .path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Destination store could not be reached
    #[error("Failed to connect to sink: {0}")]
    SinkConnection(String),

    /// Destination table could not be created
    #[error("Failed to create schema: {0}")]
    Schema(#[source] sqlx::Error),

    /// Batch insert or commit failed
    #[error("Failed to write batch: {0}")]
    Sink(#[source] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl IngestError {
    /// Whether the run can continue past this error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            IngestError::Archive { .. }
                | IngestError::FilenameFormat(_)
                | IngestError::FileAccess { .. }
        )
    }
}
