//! API shared state

use std::sync::Arc;

use crate::monitor::Monitor;
use crate::storage::StorageBackend;

/// Shared state passed to all API handlers
#[derive(Clone)]
pub struct ApiState {
    /// Generation loop, for the in-memory window and on-demand readings
    pub monitor: Monitor,

    /// Durable store, for persisted history and alert records
    pub store: Arc<dyn StorageBackend>,
}

impl ApiState {
    pub fn new(monitor: Monitor, store: Arc<dyn StorageBackend>) -> Self {
        Self { monitor, store }
    }
}
