//! Alert endpoints

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde_json::{Value, json};

use crate::alerting::{Alert, SweepReport};
use crate::api::{
    error::ApiResult,
    state::ApiState,
    types::{AcknowledgeBody, HistoryParams},
};
use crate::explorer::AlertFilter;

/// GET /api/v1/alerts?asset_id=&rule_id=&min_severity=&acknowledged=
///
/// Active alerts, most severe first, then oldest first
pub async fn list_active_alerts(
    State(state): State<ApiState>,
    Query(filter): Query<AlertFilter>,
) -> ApiResult<Json<Value>> {
    let alerts = state.hub.explorer.list_active_alerts(&filter).await?;
    Ok(Json(json!({
        "count": alerts.len(),
        "alerts": alerts,
    })))
}

/// GET /api/v1/alerts/history
///
/// Active and resolved alerts, newest first
pub async fn alert_history(
    State(state): State<ApiState>,
    Query(params): Query<HistoryParams>,
) -> ApiResult<Json<Value>> {
    let alerts = state
        .hub
        .explorer
        .alert_history(&params.filter(), params.since, params.limit)
        .await?;
    Ok(Json(json!({
        "count": alerts.len(),
        "alerts": alerts,
    })))
}

/// POST /api/v1/alerts/:id/acknowledge
pub async fn acknowledge_alert(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    body: Option<Json<AcknowledgeBody>>,
) -> ApiResult<Json<Alert>> {
    let body = body.map(|Json(body)| body).unwrap_or_default();
    let alert = state
        .hub
        .alerts
        .acknowledge(&id, body.by.as_deref())
        .await?;
    Ok(Json(alert))
}

/// POST /api/v1/alerts/sweep
///
/// Re-evaluate every asset now instead of waiting for the next interval
pub async fn sweep(State(state): State<ApiState>) -> ApiResult<Json<SweepReport>> {
    Ok(Json(state.hub.alerts.sweep().await?))
}
