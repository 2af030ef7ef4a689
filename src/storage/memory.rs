//! In-memory storage backend (no persistence)
//!
//! Useful for:
//! - Testing without database dependencies
//! - Deployments configured with `"backend": "none"`
//!
//! ## Limitations
//!
//! - **No persistence**: All data lost on restart
//! - **Limited capacity**: each collection is capped, oldest entries evicted

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::backend::{HealthStatus, StorageBackend};
use super::error::StorageResult;
use crate::{AlertRecord, Reading};

/// Maximum entries kept per collection
const MAX_ENTRIES: usize = 50_000;

#[derive(Debug, Default)]
struct Collections {
    history: VecDeque<Reading>,
    alerts: VecDeque<AlertRecord>,
    expire_after_ms: Option<i64>,
}

/// In-memory storage backend
///
/// Behaves like the SQLite backend: once indices are ensured, inserting a
/// reading drops history older than the expiry horizon relative to it.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    collections: RwLock<Collections>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of history entries currently held
    pub async fn history_len(&self) -> usize {
        self.collections.read().await.history.len()
    }

    /// Number of alert records currently held
    pub async fn alerts_len(&self) -> usize {
        self.collections.read().await.alerts.len()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn ensure_indexes(&self, expire_after: Duration) -> StorageResult<()> {
        let mut collections = self.collections.write().await;
        collections.expire_after_ms = Some(expire_after.as_millis() as i64);
        debug!("in-memory backend: history expires after {expire_after:?}");
        Ok(())
    }

    async fn insert_reading(&self, reading: &Reading) -> StorageResult<()> {
        let mut collections = self.collections.write().await;

        if let Some(expire_after) = collections.expire_after_ms {
            let cutoff = reading.timestamp - expire_after;
            collections.history.retain(|r| r.timestamp >= cutoff);
        }

        collections.history.push_back(reading.clone());
        if collections.history.len() > MAX_ENTRIES {
            collections.history.pop_front();
        }
        Ok(())
    }

    async fn insert_alert(&self, alert: &AlertRecord) -> StorageResult<()> {
        let mut collections = self.collections.write().await;
        collections.alerts.push_back(alert.clone());
        if collections.alerts.len() > MAX_ENTRIES {
            collections.alerts.pop_front();
        }
        Ok(())
    }

    async fn recent_history(&self, limit: usize) -> StorageResult<Vec<Reading>> {
        let collections = self.collections.read().await;
        let mut sorted: Vec<Reading> = collections.history.iter().cloned().collect();
        sorted.sort_by_key(|r| r.timestamp);

        let start = sorted.len().saturating_sub(limit);
        Ok(sorted.split_off(start))
    }

    async fn recent_alerts(&self, limit: usize) -> StorageResult<Vec<AlertRecord>> {
        let collections = self.collections.read().await;
        let mut sorted: Vec<AlertRecord> = collections.alerts.iter().cloned().collect();
        sorted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        sorted.truncate(limit);
        Ok(sorted)
    }

    async fn delete_history_before(&self, cutoff_ms: i64) -> StorageResult<usize> {
        let mut collections = self.collections.write().await;
        let before = collections.history.len();
        collections.history.retain(|r| r.timestamp >= cutoff_ms);
        let deleted = before - collections.history.len();
        debug!("in-memory backend: deleted {deleted} history entries");
        Ok(deleted)
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        let collections = self.collections.read().await;
        Ok(HealthStatus {
            healthy: true,
            message: "In-memory storage operational".to_string(),
            metadata: HashMap::from([
                ("backend".to_string(), "memory".to_string()),
                ("history".to_string(), collections.history.len().to_string()),
                ("alerts".to_string(), collections.alerts.len().to_string()),
            ]),
        })
    }

    async fn close(&self) -> StorageResult<()> {
        debug!("closing in-memory backend (no-op)");
        Ok(())
    }
}
