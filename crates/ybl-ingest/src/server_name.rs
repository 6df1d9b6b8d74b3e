//! Server identity from log file names
//!
//! glog names its files `<program>.<host>.<user>.log.<LEVEL>.<date-time>.<pid>`;
//! support bundles rename the program part to the pod name, e.g.
//! `yb-tserver-0.host123.log.INFO.20240609-061653.12345`. Dropping the last
//! three dot components leaves the identity (`yb-tserver-0.host123.log`).

use std::path::Path;

/// Trailing components removed from the file name (`LEVEL`, timestamp, pid)
const TRAILING_COMPONENTS: usize = 3;

/// Derive the server name from a log file path
///
/// Returns `None` when the file name has fewer than three dot-separated
/// components or when nothing remains after dropping them.
pub fn resolve(path: &Path) -> Option<String> {
    let file_name = path.file_name()?.to_str()?;
    let parts: Vec<&str> = file_name.split('.').collect();

    if parts.len() < TRAILING_COMPONENTS {
        return None;
    }

    let name = parts[..parts.len() - TRAILING_COMPONENTS].join(".");
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}
