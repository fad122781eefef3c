//! Statistics and dashboard overview endpoints

use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::api::{error::ApiResult, state::ApiState};
use crate::explorer::Overview;

/// GET /api/v1/stats
///
/// Storage statistics and server uptime
pub async fn get_stats(State(state): State<ApiState>) -> ApiResult<Json<Value>> {
    let storage = state.hub.backend().get_stats().await?;

    Ok(Json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_secs": state.started_at.elapsed().as_secs(),
        "storage": storage,
        "rules": state.hub.alerts.engine().rules().len(),
    })))
}

/// GET /api/v1/overview
pub async fn get_overview(State(state): State<ApiState>) -> ApiResult<Json<Overview>> {
    Ok(Json(state.hub.explorer.overview().await?))
}
