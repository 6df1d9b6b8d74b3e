//! Error types for YBL

use thiserror::Error;

/// Result type alias for YBL operations
pub type Result<T> = std::result::Result<T, YblError>;

/// Workspace-wide error type
#[derive(Error, Debug)]
pub enum YblError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Logging setup error: {0}")]
    Logging(String),
}
