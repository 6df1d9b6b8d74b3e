//! Log file selection
//!
//! Picks the tablet server INFO logs out of an expanded support bundle.
//! Only the file name is inspected; directory names play no role.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::SelectionConfig;

/// Walks a bundle and returns the files worth parsing
#[derive(Debug, Clone)]
pub struct FileSelector {
    config: SelectionConfig,
}

impl FileSelector {
    pub fn new(config: SelectionConfig) -> Self {
        Self { config }
    }

    /// Whether a bare file name passes the marker filters
    pub fn matches(&self, file_name: &str) -> bool {
        file_name.contains(&self.config.server_marker)
            && file_name.contains(&self.config.stream_marker)
            && (self.config.exclude_marker.is_empty()
                || !file_name.contains(&self.config.exclude_marker))
    }

    /// Return absolute paths of all eligible files under `root`, sorted
    ///
    /// Unreadable directories are logged and skipped.
    pub fn select(&self, root: &Path) -> Vec<PathBuf> {
        let root = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());
        let mut selected = Vec::new();

        for entry in WalkDir::new(&root).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable directory entry");
                    continue;
                },
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let Some(name) = entry.file_name().to_str() else {
                continue;
            };

            if self.matches(name) {
                selected.push(entry.into_path());
            }
        }

        selected.sort();
        debug!(root = %root.display(), count = selected.len(), "Selected log files");
        selected
    }
}

impl Default for FileSelector {
    fn default() -> Self {
        Self::new(SelectionConfig::default())
    }
}
