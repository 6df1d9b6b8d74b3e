//! PostgreSQL sink

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::time::Duration;
use tracing::{debug, info};

use super::{create_table_sql, insert_prefix, LogSink};
use crate::config::SinkConfig;
use crate::error::{IngestError, Result};
use crate::models::LogRecord;

/// Rows per INSERT statement; 12 binds per row keeps us under the 65535 bind limit
const ROWS_PER_STATEMENT: usize = 5000;

pub struct PostgresSink {
    pool: PgPool,
    table: String,
}

impl PostgresSink {
    pub async fn connect(config: &SinkConfig, table: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(|e| IngestError::SinkConnection(e.to_string()))?;

        let version: String = sqlx::query_scalar("SELECT version()")
            .fetch_one(&pool)
            .await
            .map_err(|e| IngestError::SinkConnection(e.to_string()))?;
        info!(version = %version, "Connected to PostgreSQL");

        Ok(Self::from_pool(pool, table))
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: PgPool, table: &str) -> Self {
        Self {
            pool,
            table: table.to_string(),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl LogSink for PostgresSink {
    fn name(&self) -> &'static str {
        "postgres"
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
            let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(insert_prefix(&self.table));

            query_builder.push_values(chunk, |mut b, record| {
                b.push_bind(&record.server_name)
                    .push_bind(record.log_level.as_str())
                    .push_bind(&record.month)
                    .push_bind(&record.day)
                    .push_bind(&record.hour)
                    .push_bind(&record.minute)
                    .push_bind(&record.second)
                    .push_bind(&record.microseconds)
                    .push_bind(&record.thread_id)
                    .push_bind(&record.file)
                    .push_bind(&record.line)
                    .push_bind(&record.message);
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
