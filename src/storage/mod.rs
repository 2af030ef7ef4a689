//! Durable reading store
//!
//! This module provides a trait-based abstraction for persisting readings
//! and alert records.
//!
//! ## Design
//!
//! - **Trait-based**: `StorageBackend` trait allows swapping implementations
//! - **Async**: All operations are async for compatibility with Tokio
//! - **Best-effort**: the monitor never lets a storage failure affect its
//!   in-memory state
//!
//! ## Backends
//!
//! - **SQLite** (default): Embedded database
//! - **In-Memory**: No persistence, for testing or storage-less deployments
//!
//! ## Usage
//!
//! ```no_run
//! use pulse_monitor::storage::{StorageBackend, sqlite::SqliteBackend};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let backend = SqliteBackend::new("./pulse.db").await?;
//!     let recent = backend.recent_history(120).await?;
//!     println!("{} readings", recent.len());
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod error;
pub mod memory;
#[cfg(feature = "storage-sqlite")]
pub mod sqlite;

pub use backend::{HealthStatus, StorageBackend};
pub use error::{StorageError, StorageResult};
pub use memory::MemoryBackend;
