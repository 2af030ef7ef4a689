use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use super::{Envelope, parse_limit};
use crate::AlertRecord;
use crate::api::{ApiResult, state::ApiState};

const DEFAULT_ALERT_LIMIT: i64 = 20;

#[derive(Debug, Deserialize)]
pub struct AlertsQuery {
    pub limit: Option<String>,
}

/// GET /api/alerts?limit=N
///
/// Most recent alert records, newest first.
#[instrument(skip(state))]
pub async fn recent_alerts(
    State(state): State<ApiState>,
    Query(query): Query<AlertsQuery>,
) -> ApiResult<Json<Envelope<Vec<AlertRecord>>>> {
    let limit = parse_limit(query.limit, DEFAULT_ALERT_LIMIT);
    let alerts = state.store.recent_alerts(limit as usize).await?;
    Ok(Json(Envelope::ok(alerts)))
}
