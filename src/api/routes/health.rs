//! Health check endpoint

use axum::{Json, extract::State};
use serde::Serialize;
use std::collections::HashMap;

use crate::api::state::ApiState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub monitor_running: bool,
    pub storage: StorageHealth,
}

#[derive(Debug, Serialize)]
pub struct StorageHealth {
    pub healthy: bool,
    pub message: String,
    pub metadata: HashMap<String, String>,
}

/// GET /api/v1/health
///
/// Always answers 200; a failing store shows up as `"degraded"`.
pub async fn health_check(State(state): State<ApiState>) -> Json<HealthResponse> {
    let storage = match state.store.health_check().await {
        Ok(health) => StorageHealth {
            healthy: health.healthy,
            message: health.message,
            metadata: health.metadata,
        },
        Err(e) => StorageHealth {
            healthy: false,
            message: e.to_string(),
            metadata: HashMap::new(),
        },
    };

    Json(HealthResponse {
        status: if storage.healthy { "ok" } else { "degraded" }.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        monitor_running: state.monitor.is_running().await,
        storage,
    })
}
