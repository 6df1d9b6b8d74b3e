//! In-place expansion of support bundle archives
//!
//! Support bundles nest archives: a `.tar.gz` per node whose log directories
//! contain rotated `.gz` logs. [`ArchiveExpander::expand`] keeps walking the
//! tree until no expandable archive is left, so contents of freshly extracted
//! bundles are expanded too.
//!
//! # Supported Suffixes
//!
//! - **`.gz`**: decompressed to the sibling path without `.gz`
//! - **`.tar.gz` / `.tgz`**: unpacked into a directory named without the suffix
//!
//! The original archive is removed only after a successful expansion. Broken
//! archives are reported and left on disk; they are not retried within a run.

use flate2::read::{GzDecoder, MultiGzDecoder};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::IngestError;

/// Upper bound on expansion passes, guards against self-reproducing archives
const MAX_PASSES: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    /// Single compressed file
    Gzip,
    /// Gzip-compressed tarball
    TarGz,
}

impl ArchiveKind {
    /// Classify a file name, returning the kind and the name with the suffix stripped
    pub fn classify(file_name: &str) -> Option<(ArchiveKind, &str)> {
        let (kind, stem) = if let Some(stem) = file_name.strip_suffix(".tar.gz") {
            (ArchiveKind::TarGz, stem)
        } else if let Some(stem) = file_name.strip_suffix(".tgz") {
            (ArchiveKind::TarGz, stem)
        } else if let Some(stem) = file_name.strip_suffix(".gz") {
            (ArchiveKind::Gzip, stem)
        } else {
            return None;
        };

        if stem.is_empty() {
            None
        } else {
            Some((kind, stem))
        }
    }
}

/// Outcome of one expansion run
#[derive(Debug, Default)]
pub struct ExpansionReport {
    /// Archives expanded and removed
    pub expanded: usize,
    /// Archives that could not be expanded (left in place)
    pub failures: Vec<IngestError>,
}

impl ExpansionReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

/// Recursively expands `.gz`, `.tar.gz` and `.tgz` files in place
#[derive(Debug, Default, Clone)]
pub struct ArchiveExpander;

impl ArchiveExpander {
    pub fn new() -> Self {
        Self
    }

    /// Expand every archive under `root`
    ///
    /// Blocking; run it on a blocking thread from async code. Running it a
    /// second time on an expanded tree does nothing.
    pub fn expand(&self, root: &Path) -> ExpansionReport {
        let mut report = ExpansionReport::default();
        let mut failed: HashSet<PathBuf> = HashSet::new();

        for pass in 1..=MAX_PASSES {
            let candidates = collect_archives(root, &failed);
            if candidates.is_empty() {
                debug!(passes = pass - 1, "Archive expansion settled");
                return report;
            }

            debug!(pass, count = candidates.len(), "Expanding archives");

            for (path, kind, destination) in candidates {
                match expand_one(&path, kind, &destination) {
                    Ok(()) => {
                        info!("Extracted {} to {}", path.display(), destination.display());
                        report.expanded += 1;
                    },
                    Err(e) => {
                        warn!(error = %e, "Leaving archive in place");
                        failed.insert(path);
                        report.failures.push(e);
                    },
                }
            }
        }

        warn!(
            max_passes = MAX_PASSES,
            "Archive expansion stopped before the tree settled; remaining archives are ignored"
        );
        report
    }
}

fn collect_archives(root: &Path, failed: &HashSet<PathBuf>) -> Vec<(PathBuf, ArchiveKind, PathBuf)> {
    let mut candidates = Vec::new();

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable directory entry");
                continue;
            },
        };

        if !entry.file_type().is_file() || failed.contains(entry.path()) {
            continue;
        }

        let Some(name) = entry.file_name().to_str() else {
            continue;
        };

        if let Some((kind, stem)) = ArchiveKind::classify(name) {
            let destination = entry.path().with_file_name(stem);
            candidates.push((entry.path().to_path_buf(), kind, destination));
        }
    }

    candidates
}

fn expand_one(path: &Path, kind: ArchiveKind, destination: &Path) -> Result<(), IngestError> {
    let result = match kind {
        ArchiveKind::Gzip => decompress_gzip_file(path, destination),
        ArchiveKind::TarGz => unpack_tar_gz(path, destination),
    };

    result
        .and_then(|()| fs::remove_file(path))
        .map_err(|e| IngestError::Archive {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

/// Stream a (possibly multi-member) gzip file to `destination`
///
/// Output goes to a `.partial` sibling that is renamed into place only once
/// decompression succeeded, so a broken archive never touches an existing
/// `destination`.
fn decompress_gzip_file(path: &Path, destination: &Path) -> io::Result<()> {
    let partial = partial_path(destination);
    let mut decoder = MultiGzDecoder::new(BufReader::new(File::open(path)?));
    let mut output = BufWriter::new(File::create(&partial)?);

    let copied = io::copy(&mut decoder, &mut output).and_then(|bytes| {
        output.flush()?;
        Ok(bytes)
    });
    drop(output);

    match copied.and_then(|bytes| fs::rename(&partial, destination).map(|()| bytes)) {
        Ok(bytes) => {
            debug!("Decompressed {} -> {} bytes", path.display(), bytes);
            Ok(())
        },
        Err(e) => {
            let _ = fs::remove_file(&partial);
            Err(e)
        },
    }
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_owned();
    name.push(".partial");
    PathBuf::from(name)
}

/// Unpack a gzip-compressed tarball into `destination`
///
/// Members whose paths would escape `destination` are skipped by `tar`.
fn unpack_tar_gz(path: &Path, destination: &Path) -> io::Result<()> {
    let decoder = GzDecoder::new(BufReader::new(File::open(path)?));
    let mut archive = tar::Archive::new(decoder);
    fs::create_dir_all(destination)?;
    archive.unpack(destination)
}
