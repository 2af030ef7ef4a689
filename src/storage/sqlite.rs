//! SQLite storage backend implementation
//!
//! ## Features
//!
//! - **Embedded**: No separate database server required
//! - **WAL mode**: Reads from the API do not block the generation loop's writes
//! - **Connection pooling**: Shared with the session-based recipient lookup
//! - **Migrations**: Automatic schema versioning with sqlx
//!
//! ## Expiry
//!
//! SQLite has no TTL index. `ensure_indexes` installs a time index plus an
//! `AFTER INSERT` trigger that removes history rows older than the horizon,
//! which gives the same effect as an expiring index. The monitor's hourly
//! retention sweep runs on top of it and tolerates rows already gone.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Pool, Row, Sqlite};
use tracing::{debug, info, instrument, warn};

use super::backend::{HealthStatus, StorageBackend};
use super::error::{StorageError, StorageResult};
use crate::{AlertRecord, Reading};

/// SQLite storage backend
pub struct SqliteBackend {
    pool: Pool<Sqlite>,
    db_path: String,
}

impl SqliteBackend {
    /// Create a new SQLite backend
    ///
    /// This will:
    /// 1. Create the database file if it doesn't exist
    /// 2. Run migrations to create tables
    /// 3. Configure SQLite for concurrent reads (WAL mode)
    ///
    /// ## Example
    ///
    /// ```no_run
    /// # use pulse_monitor::storage::sqlite::SqliteBackend;
    /// # async fn example() -> anyhow::Result<()> {
    /// let backend = SqliteBackend::new("./pulse.db").await?;
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip_all)]
    pub async fn new(db_path: impl AsRef<Path>) -> StorageResult<Self> {
        let db_path_str = db_path.as_ref().to_string_lossy().to_string();

        info!("initializing SQLite backend at: {}", db_path_str);

        let options = SqliteConnectOptions::new()
            .filename(&db_path_str)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        debug!("running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;

        info!("database migrations complete");

        Ok(Self {
            pool,
            db_path: db_path_str,
        })
    }

    /// Connection pool, shared with [`crate::recipients::SessionRecipients`]
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    fn reading_from_row(row: &SqliteRow) -> StorageResult<Reading> {
        Ok(Reading {
            timestamp: row.try_get("timestamp")?,
            cpu: row.try_get("cpu")?,
            mem: row.try_get("mem")?,
            disk: row.try_get("disk")?,
            temperature: row.try_get("temperature")?,
            is_alert: row.try_get("is_alert")?,
            alert_message: row.try_get("message")?,
        })
    }

    fn alert_from_row(row: &SqliteRow) -> StorageResult<AlertRecord> {
        Ok(AlertRecord {
            timestamp: row.try_get("timestamp")?,
            cpu: row.try_get("cpu")?,
            temperature: row.try_get("temperature")?,
            message: row.try_get("message")?,
        })
    }
}

#[async_trait]
impl StorageBackend for SqliteBackend {
    #[instrument(skip(self))]
    async fn ensure_indexes(&self, expire_after: Duration) -> StorageResult<()> {
        let expire_ms = expire_after.as_millis() as i64;

        let statements = [
            "CREATE INDEX IF NOT EXISTS idx_history_timestamp ON history (timestamp)".to_string(),
            "DROP TRIGGER IF EXISTS history_expire".to_string(),
            format!(
                r#"
                CREATE TRIGGER history_expire AFTER INSERT ON history
                BEGIN
                    DELETE FROM history WHERE timestamp < NEW.timestamp - {expire_ms};
                END
                "#
            ),
            "CREATE INDEX IF NOT EXISTS idx_alerts_timestamp ON alerts (timestamp)".to_string(),
        ];

        for statement in statements {
            sqlx::query(&statement)
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::IndexFailed(e.to_string()))?;
        }

        info!("history expires after {}s", expire_after.as_secs());
        Ok(())
    }

    #[instrument(skip_all, fields(timestamp = reading.timestamp))]
    async fn insert_reading(&self, reading: &Reading) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO history (timestamp, cpu, mem, disk, temperature, is_alert, message)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(reading.timestamp)
        .bind(reading.cpu)
        .bind(reading.mem)
        .bind(reading.disk)
        .bind(reading.temperature)
        .bind(reading.is_alert)
        .bind(reading.alert_message.as_deref())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip_all, fields(timestamp = alert.timestamp))]
    async fn insert_alert(&self, alert: &AlertRecord) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO alerts (timestamp, cpu, temperature, message)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(alert.timestamp)
        .bind(alert.cpu)
        .bind(alert.temperature)
        .bind(&alert.message)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn recent_history(&self, limit: usize) -> StorageResult<Vec<Reading>> {
        let rows = sqlx::query(
            r#"
            SELECT timestamp, cpu, mem, disk, temperature, is_alert, message
            FROM history
            ORDER BY timestamp DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut readings = rows
            .iter()
            .map(Self::reading_from_row)
            .collect::<StorageResult<Vec<_>>>()?;

        // Reverse to get chronological order (oldest first)
        readings.reverse();
        debug!("query returned {} readings", readings.len());
        Ok(readings)
    }

    #[instrument(skip(self))]
    async fn recent_alerts(&self, limit: usize) -> StorageResult<Vec<AlertRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT timestamp, cpu, temperature, message
            FROM alerts
            ORDER BY timestamp DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::alert_from_row).collect()
    }

    #[instrument(skip(self))]
    async fn delete_history_before(&self, cutoff_ms: i64) -> StorageResult<usize> {
        let result = sqlx::query("DELETE FROM history WHERE timestamp < ?")
            .bind(cutoff_ms)
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected() as usize;
        debug!("deleted {} expired history rows", deleted);
        Ok(deleted)
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> StorageResult<HealthStatus> {
        match sqlx::query("SELECT 1").fetch_one(&self.pool).await {
            Ok(_) => Ok(HealthStatus {
                healthy: true,
                message: "SQLite backend operational".to_string(),
                metadata: HashMap::from([
                    ("backend".to_string(), "sqlite".to_string()),
                    ("db_path".to_string(), self.db_path.clone()),
                ]),
            }),
            Err(e) => {
                warn!("health check failed: {}", e);
                Ok(HealthStatus {
                    healthy: false,
                    message: format!("health check failed: {}", e),
                    metadata: HashMap::new(),
                })
            }
        }
    }

    async fn close(&self) -> StorageResult<()> {
        info!("closing SQLite backend");
        self.pool.close().await;
        Ok(())
    }
}
