//! End-to-end ingestion of one support bundle
//!
//! A run always follows the same lifecycle:
//!
//! ```text
//! connect -> ensure_schema -> expand archives -> select files -> ingest -> flush remainder -> close
//! ```
//!
//! Per-file problems (unresolvable server name, unreadable file) are logged
//! and the file is skipped. Sink problems abort the run; batches committed
//! before the failure stay in the store.

use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};

use crate::archive::ArchiveExpander;
use crate::batch::{BatchStats, BatchWriter};
use crate::config::IngestConfig;
use crate::error::{IngestError, Result};
use crate::models::LogLevel;
use crate::parser::LineParser;
use crate::selector::FileSelector;
use crate::server_name;
use crate::sink::{self, LogSink};

/// Counters of one finished run
#[derive(Debug, Default, Clone, Serialize)]
pub struct IngestSummary {
    pub files_selected: usize,
    pub files_processed: usize,
    pub files_skipped: usize,
    pub lines_read: usize,
    pub records_parsed: usize,
    pub records_written: usize,
    pub batches_flushed: usize,
    pub archives_expanded: usize,
    pub archives_failed: usize,
    pub duration_seconds: f64,
}

impl IngestSummary {
    fn add_file(&mut self, stats: FileStats) {
        self.files_processed += 1;
        self.lines_read += stats.lines_read;
        self.records_parsed += stats.records_parsed;
    }

    fn add_batches(&mut self, stats: BatchStats) {
        self.records_written += stats.records_written;
        self.batches_flushed += stats.batches_flushed;
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct FileStats {
    lines_read: usize,
    records_parsed: usize,
}

pub struct IngestOrchestrator {
    config: IngestConfig,
    parser: LineParser,
    selector: FileSelector,
    expander: ArchiveExpander,
}

impl IngestOrchestrator {
    pub fn new(config: IngestConfig) -> Result<Self> {
        config.validate()?;
        let parser = LineParser::new().map_err(|e| IngestError::Config(e.to_string()))?;
        let selector = FileSelector::new(config.selection.clone());

        Ok(Self {
            config,
            parser,
            selector,
            expander: ArchiveExpander::new(),
        })
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Connect to the configured sink, ingest, and close the sink
    ///
    /// The sink is closed whether or not ingestion succeeded.
    pub async fn run(&self) -> Result<IngestSummary> {
        self.check_root()?;
        let sink = sink::connect(&self.config.sink, &self.config.table_name).await?;
        let result = self.run_with_sink(sink.as_ref()).await;
        sink.close().await;
        result
    }

    /// Ingest into an already connected sink (left open on return)
    pub async fn run_with_sink(&self, sink: &dyn LogSink) -> Result<IngestSummary> {
        let started = Instant::now();
        let root = &self.config.root_path;
        self.check_root()?;

        sink.ensure_schema().await?;

        // Both walk the filesystem synchronously
        let expander = self.expander.clone();
        let selector = self.selector.clone();
        let walk_root = root.clone();
        let (report, files) = tokio::task::spawn_blocking(move || {
            let report = expander.expand(&walk_root);
            (report, selector.select(&walk_root))
        })
        .await?;

        let mut summary = IngestSummary {
            archives_expanded: report.expanded,
            archives_failed: report.failed(),
            files_selected: files.len(),
            ..Default::default()
        };

        info!(
            root = %root.display(),
            files = files.len(),
            concurrency = self.config.concurrency,
            "Starting ingestion"
        );

        if self.config.concurrency <= 1 {
            self.ingest_sequential(sink, &files, &mut summary).await?;
        } else {
            self.ingest_concurrent(sink, &files, &mut summary).await?;
        }

        summary.duration_seconds = started.elapsed().as_secs_f64();
        info!(
            files_processed = summary.files_processed,
            files_skipped = summary.files_skipped,
            records_written = summary.records_written,
            batches = summary.batches_flushed,
            duration_secs = summary.duration_seconds,
            "Ingestion complete"
        );
        Ok(summary)
    }

    fn check_root(&self) -> Result<()> {
        let root = &self.config.root_path;
        if root.is_dir() {
            Ok(())
        } else {
            Err(IngestError::Config(format!(
                "bundle root {} is not a directory",
                root.display()
            )))
        }
    }

    /// One writer shared by all files, so a batch may span file boundaries
    async fn ingest_sequential(
        &self,
        sink: &dyn LogSink,
        files: &[PathBuf],
        summary: &mut IngestSummary,
    ) -> Result<()> {
        let mut writer = BatchWriter::new(sink, self.config.batch_size);

        for path in files {
            match self.ingest_file(path, &mut writer).await {
                Ok(stats) => summary.add_file(stats),
                Err(e) if e.is_recoverable() => {
                    report_skipped(&e);
                    summary.files_skipped += 1;
                },
                Err(e) => return Err(e),
            }
        }

        summary.add_batches(writer.finish().await?);
        Ok(())
    }

    /// Up to `concurrency` files in flight, each with its own writer
    async fn ingest_concurrent(
        &self,
        sink: &dyn LogSink,
        files: &[PathBuf],
        summary: &mut IngestSummary,
    ) -> Result<()> {
        let batch_size = self.config.batch_size;

        let mut outcomes = stream::iter(files)
            .map(|path| async move {
                let mut writer = BatchWriter::new(sink, batch_size);
                let outcome = match self.ingest_file(path, &mut writer).await {
                    Err(e) if !e.is_recoverable() => return Err(e),
                    other => other,
                };
                let written = writer.finish().await?;
                Ok::<_, IngestError>((outcome, written))
            })
            .buffer_unordered(self.config.concurrency);

        // Returning early drops the stream and cancels files still in flight
        while let Some(result) = outcomes.next().await {
            let (outcome, written) = result?;
            summary.add_batches(written);
            match outcome {
                Ok(stats) => summary.add_file(stats),
                Err(e) => {
                    report_skipped(&e);
                    summary.files_skipped += 1;
                },
            }
        }

        Ok(())
    }

    /// Parse one file into `writer`
    ///
    /// Lines are read as bytes and decoded lossily, so stray invalid UTF-8
    /// costs at most the affected line.
    async fn ingest_file(&self, path: &Path, writer: &mut BatchWriter<'_>) -> Result<FileStats> {
        let server_name = server_name::resolve(path)
            .ok_or_else(|| IngestError::FilenameFormat(path.to_path_buf()))?;

        let file = File::open(path).await.map_err(|source| IngestError::FileAccess {
            path: path.to_path_buf(),
            source,
        })?;

        info!(path = %path.display(), server = %server_name, "Processing file");

        let mut reader = BufReader::new(file);
        let mut buf = Vec::with_capacity(1024);
        let mut stats = FileStats::default();

        loop {
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .await
                .map_err(|source| IngestError::FileAccess {
                    path: path.to_path_buf(),
                    source,
                })?;
            if read == 0 {
                break;
            }
            stats.lines_read += 1;

            let line = String::from_utf8_lossy(&buf);
            if !LogLevel::starts_line(&line) {
                continue;
            }
            if let Some(record) = self.parser.parse(&line, &server_name) {
                stats.records_parsed += 1;
                writer.push(record).await?;
            }
        }

        debug!(
            path = %path.display(),
            lines = stats.lines_read,
            records = stats.records_parsed,
            "Finished file"
        );
        Ok(stats)
    }
}

fn report_skipped(err: &IngestError) {
    match err {
        IngestError::FilenameFormat(_) => warn!("{err}, skipping"),
        _ => error!(error = %err, "Skipping file"),
    }
}
