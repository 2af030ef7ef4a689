//! Storage backend trait definition
//!
//! This module defines the core `StorageBackend` trait that all
//! storage implementations must implement.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use super::error::StorageResult;
use crate::{AlertRecord, Reading};

/// Health status of the storage backend
#[derive(Debug, Clone)]
pub struct HealthStatus {
    /// Is the backend operational?
    pub healthy: bool,

    /// Human-readable status message
    pub message: String,

    /// Additional backend-specific metadata
    pub metadata: HashMap<String, String>,
}

/// Trait for the durable reading store
///
/// The store keeps two append-only collections: `history` with every
/// generated reading, and `alerts` with the narrow record of alerting
/// readings. History is subject to a retention horizon.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync` as they are shared between the
/// generation loop and the read API.
///
/// ## Error Handling
///
/// Methods return `StorageResult<T>`. Callers in the generation loop log
/// and swallow these errors; persistence is best-effort.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Ensure the indices the monitor relies on exist
    ///
    /// - an expiring time index on history, removing entries older than
    ///   `expire_after`
    /// - a time index on alerts for recent-first queries
    ///
    /// Must be safe to call repeatedly.
    async fn ensure_indexes(&self, expire_after: Duration) -> StorageResult<()>;

    /// Append a reading to the history collection
    async fn insert_reading(&self, reading: &Reading) -> StorageResult<()>;

    /// Append an alert record to the alerts collection
    async fn insert_alert(&self, alert: &AlertRecord) -> StorageResult<()>;

    /// Get the `limit` most recent history entries, oldest first
    async fn recent_history(&self, limit: usize) -> StorageResult<Vec<Reading>>;

    /// Get the `limit` most recent alert records, newest first
    async fn recent_alerts(&self, limit: usize) -> StorageResult<Vec<AlertRecord>>;

    /// Delete history entries with a timestamp strictly before `cutoff_ms`
    ///
    /// Entries that already expired through the store's own mechanism are
    /// simply not counted. Returns the number of entries deleted.
    async fn delete_history_before(&self, cutoff_ms: i64) -> StorageResult<usize>;

    /// Check backend health
    async fn health_check(&self) -> StorageResult<HealthStatus>;

    /// Close the backend and release resources
    async fn close(&self) -> StorageResult<()>;
}
