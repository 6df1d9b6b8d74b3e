//! Shared fixtures for ybl-ingest integration tests
//!
//! Bundles are built on the fly with `flate2` and `tar` inside a `TempDir`;
//! the destination is a SQLite file in a separate `TempDir` so it never shows
//! up in the bundle walk.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use flate2::write::GzEncoder;
use flate2::Compression;
use sqlx::SqlitePool;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Sample tablet server log name, server name `yb-tserver-0.node1.log`
pub const TSERVER_LOG: &str = "yb-tserver-0.node1.log.INFO.20240609-061653.12345";

pub fn init_test_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,ybl_ingest=debug,sqlx=warn")),
        )
        .with_test_writer()
        .try_init();
}

/// `count` structured INFO lines, thread ids starting at `first`
pub fn log_lines(first: usize, count: usize) -> String {
    (first..first + count)
        .map(|i| {
            format!(
                "I0609 06:16:53.{:06} {} raft_consensus.cc:123] Leader stepdown request {}\n",
                i % 1_000_000,
                i,
                i
            )
        })
        .collect()
}

/// Lines the parser must reject
pub fn noise_lines(count: usize) -> String {
    (0..count)
        .map(|i| match i % 3 {
            0 => format!("    @ 0x{:x}  yb::Thread::SuperviseThread()\n", 0x7f00 + i),
            1 => "Log file created at: 2024/06/09 06:16:53\n".to_string(),
            _ => "Running on machine: node1\n".to_string(),
        })
        .collect()
}

pub fn gzip(content: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(content).unwrap();
    encoder.finish().unwrap()
}

pub fn tar_gz(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (name, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, *data).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

/// A support bundle root plus a SQLite destination outside of it
pub struct TestBundle {
    pub root: TempDir,
    db_dir: TempDir,
}

impl TestBundle {
    pub fn new() -> Self {
        Self {
            root: TempDir::new().unwrap(),
            db_dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    pub fn write(&self, relative: &str, content: impl AsRef<[u8]>) -> PathBuf {
        let path = self.root.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    pub fn sqlite_path(&self) -> PathBuf {
        self.db_dir.path().join("logs.db")
    }

    pub fn sqlite_url(&self) -> String {
        format!("sqlite://{}", self.sqlite_path().display())
    }

    pub async fn pool(&self) -> SqlitePool {
        SqlitePool::connect(&self.sqlite_url()).await.unwrap()
    }

    pub async fn count_rows(&self, table: &str) -> i64 {
        let pool = self.pool().await;
        let count = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&pool)
            .await
            .unwrap();
        pool.close().await;
        count
    }

    /// Relative paths of every entry below the bundle root, sorted
    pub fn tree(&self) -> Vec<String> {
        let mut entries: Vec<String> = walkdir::WalkDir::new(self.root.path())
            .min_depth(1)
            .into_iter()
            .map(|e| e.unwrap())
            .map(|e| e.path().strip_prefix(self.root.path()).unwrap().display().to_string())
            .collect();
        entries.sort();
        entries
    }
}
