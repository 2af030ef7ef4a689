//! Server status endpoints

use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::{error, instrument};

use super::{Envelope, parse_limit};
use crate::Reading;
use crate::api::{ApiError, ApiResult, state::ApiState};
use crate::config::DEFAULT_WINDOW;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStatus {
    pub latest: Option<Reading>,
    pub history: Vec<Reading>,
    pub last_alert: Option<Reading>,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub limit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<String>,
    pub metric: Option<String>,
}

/// One metric of one persisted reading
#[derive(Debug, Serialize)]
pub struct MetricPoint {
    pub timestamp: i64,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Cpu,
    Mem,
    Disk,
    Temperature,
}

impl Metric {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "cpu" => Some(Metric::Cpu),
            "mem" => Some(Metric::Mem),
            "disk" => Some(Metric::Disk),
            "temperature" => Some(Metric::Temperature),
            _ => None,
        }
    }

    pub fn value_of(self, reading: &Reading) -> f64 {
        match self {
            Metric::Cpu => reading.cpu,
            Metric::Mem => reading.mem,
            Metric::Disk => reading.disk,
            Metric::Temperature => reading.temperature,
        }
    }
}

/// Either full readings or one metric per reading
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum HistoryData {
    Readings(Vec<Reading>),
    Points(Vec<MetricPoint>),
}

/// GET /api/server-status?limit=N
///
/// Latest reading, the in-memory window of the last N readings and the last alert.
pub async fn server_status(
    State(state): State<ApiState>,
    Query(query): Query<StatusQuery>,
) -> Json<Envelope<ServerStatus>> {
    let limit = parse_limit(query.limit, DEFAULT_WINDOW);

    Json(Envelope::ok(ServerStatus {
        latest: state.monitor.latest().await,
        history: state.monitor.recent_window(limit).await,
        last_alert: state.monitor.last_alert().await,
    }))
}

/// GET /api/server-status/history?limit=N&metric=cpu|mem|disk|temperature
///
/// Persisted history, oldest first.
#[instrument(skip(state))]
pub async fn persisted_history(
    State(state): State<ApiState>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<Envelope<HistoryData>>> {
    let metric = match query.metric.as_deref().filter(|name| !name.is_empty()) {
        Some(name) => Some(
            Metric::parse(name)
                .ok_or_else(|| ApiError::InvalidRequest(format!("invalid metric '{name}'")))?,
        ),
        None => None,
    };

    let limit = parse_limit(query.limit, DEFAULT_WINDOW);
    let readings = state.store.recent_history(limit as usize).await?;

    let data = match metric {
        Some(metric) => HistoryData::Points(
            readings
                .iter()
                .map(|reading| MetricPoint {
                    timestamp: reading.timestamp,
                    value: metric.value_of(reading),
                })
                .collect(),
        ),
        None => HistoryData::Readings(readings),
    };

    Ok(Json(Envelope::ok(data)))
}

/// POST /api/server-status/generate
pub async fn generate_reading(
    State(state): State<ApiState>,
) -> ApiResult<Json<Envelope<Reading>>> {
    let reading = state.monitor.generate_once().await.inspect_err(|e| {
        error!("on-demand generation failed: {}", e);
    })?;

    Ok(Json(Envelope::ok(reading)))
}
