//! SQLite sink
//!
//! Handy for analysing a single bundle on a laptop:
//! `sqlite3 logs.db "select server_name, count(*) from logs group by 1"`.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use super::{create_table_sql, insert_prefix, LogSink};
use crate::config::SinkConfig;
use crate::error::{IngestError, Result};
use crate::models::LogRecord;

/// Rows per INSERT statement; SQLite allows at most 32766 binds per statement
const ROWS_PER_STATEMENT: usize = 2500;

pub struct SqliteSink {
    pool: SqlitePool,
    table: String,
}

impl SqliteSink {
    pub async fn connect(config: &SinkConfig, table: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| IngestError::SinkConnection(e.to_string()))?
            .create_if_missing(true);

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs));

        // Each in-memory connection is its own database; keep exactly one alive
        if is_in_memory(&config.url) {
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| IngestError::SinkConnection(e.to_string()))?;

        Ok(Self::from_pool(pool, table))
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: SqlitePool, table: &str) -> Self {
        Self {
            pool,
            table: table.to_string(),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

#[async_trait]
impl LogSink for SqliteSink {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn ensure_schema(&self) -> Result<()> {
        let sql = create_table_sql(&self.table);
        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(IngestError::Schema)?;
        debug!(table = %self.table, "Schema ready");
        Ok(())
    }

    async fn write_batch(&self, records: &[LogRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(IngestError::Sink)?;

        for chunk in records.chunks(ROWS_PER_STATEMENT) {
            let mut query_builder: QueryBuilder<Sqlite> = QueryBuilder::new(insert_prefix(&self.table));

            query_builder.push_values(chunk, |mut b, record| {
                b.push_bind(record.server_name.as_str())
                    .push_bind(record.log_level.as_str())
                    .push_bind(record.month.as_str())
                    .push_bind(record.day.as_str())
                    .push_bind(record.hour.as_str())
                    .push_bind(record.minute.as_str())
                    .push_bind(record.second.as_str())
                    .push_bind(record.microseconds.as_str())
                    .push_bind(record.thread_id.as_str())
                    .push_bind(record.file.as_str())
                    .push_bind(record.line.as_str())
                    .push_bind(record.message.as_str());
            });

            query_builder
                .build()
                .execute(&mut *tx)
                .await
                .map_err(IngestError::Sink)?;
        }

        tx.commit().await.map_err(IngestError::Sink)?;
        debug!(rows = records.len(), "Committed batch");
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LogLevel;

    fn record(message: &str) -> LogRecord {
        LogRecord {
            server_name: "yb-tserver-0.host.log".to_string(),
            log_level: LogLevel::Warning,
            month: "06".to_string(),
            day: "09".to_string(),
            hour: "06".to_string(),
            minute: "16".to_string(),
            second: "53".to_string(),
            microseconds: "123456".to_string(),
            thread_id: "12345".to_string(),
            file: "raft_consensus.cc".to_string(),
            line: "123".to_string(),
            message: message.to_string(),
        }
    }

    async fn memory_sink() -> SqliteSink {
        let sink = SqliteSink::connect(&SinkConfig::new("sqlite::memory:"), "logs")
            .await
            .unwrap();
        sink.ensure_schema().await.unwrap();
        sink
    }

    #[tokio::test]
    async fn test_ensure_schema_is_idempotent() {
        let sink = memory_sink().await;
        sink.ensure_schema().await.unwrap();
        sink.close().await;
    }

    #[tokio::test]
    async fn test_write_batch_preserves_order_and_fields() {
        let sink = memory_sink().await;
        let records: Vec<LogRecord> = (0..3).map(|i| record(&format!("msg {i}"))).collect();

        sink.write_batch(&records).await.unwrap();

        let rows: Vec<(String, String, String)> =
            sqlx::query_as("SELECT log_level, file, message FROM logs ORDER BY rowid")
                .fetch_all(sink.pool())
                .await
                .unwrap();
        assert_eq!(
            rows,
            vec![
                ("W".to_string(), "raft_consensus.cc".to_string(), "msg 0".to_string()),
                ("W".to_string(), "raft_consensus.cc".to_string(), "msg 1".to_string()),
                ("W".to_string(), "raft_consensus.cc".to_string(), "msg 2".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_write_batch_larger_than_one_statement() {
        let sink = memory_sink().await;
        let records: Vec<LogRecord> = (0..ROWS_PER_STATEMENT + 7).map(|i| record(&i.to_string())).collect();

        sink.write_batch(&records).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM logs")
            .fetch_one(sink.pool())
            .await
            .unwrap();
        assert_eq!(count as usize, ROWS_PER_STATEMENT + 7);
    }

    #[tokio::test]
    async fn test_write_without_schema_fails() {
        let sink = SqliteSink::connect(&SinkConfig::new("sqlite::memory:"), "logs")
            .await
            .unwrap();
        let err = sink.write_batch(&[record("x")]).await.unwrap_err();
        assert!(matches!(err, IngestError::Sink(_)));
    }
}
