//! Bounded record batching in front of a [`LogSink`]

use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::models::LogRecord;
use crate::sink::LogSink;

/// Records preallocated per writer; larger batches grow on demand
const INITIAL_CAPACITY: usize = 1024;

/// Counters of what a writer has committed
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    pub records_written: usize,
    pub batches_flushed: usize,
}

/// Accumulates records and commits them in batches of `batch_size`
///
/// Call [`BatchWriter::finish`] at end of input to commit the partial batch.
pub struct BatchWriter<'a> {
    sink: &'a dyn LogSink,
    batch: Vec<LogRecord>,
    batch_size: usize,
    stats: BatchStats,
}

impl<'a> BatchWriter<'a> {
    pub fn new(sink: &'a dyn LogSink, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            sink,
            batch: Vec::with_capacity(batch_size.min(INITIAL_CAPACITY)),
            batch_size,
            stats: BatchStats::default(),
        }
    }

    /// Append a record, committing the batch once it is full
    pub async fn push(&mut self, record: LogRecord) -> Result<()> {
        self.batch.push(record);
        if self.batch.len() >= self.batch_size {
            self.flush().await?;
        }
        Ok(())
    }

    /// Commit whatever is buffered (no-op when empty)
    pub async fn flush(&mut self) -> Result<()> {
        if self.batch.is_empty() {
            return Ok(());
        }

        self.sink.write_batch(&self.batch).await?;

        self.stats.records_written += self.batch.len();
        self.stats.batches_flushed += 1;
        debug!(
            rows = self.batch.len(),
            batches = self.stats.batches_flushed,
            sink = self.sink.name(),
            "Flushed batch"
        );
        self.batch.clear();
        Ok(())
    }

    /// Records buffered but not yet committed
    pub fn pending(&self) -> usize {
        self.batch.len()
    }

    pub fn stats(&self) -> BatchStats {
        self.stats
    }

    /// Commit the remainder and return the final counters
    pub async fn finish(mut self) -> Result<BatchStats> {
        self.flush().await?;
        Ok(self.stats)
    }
}
