//! Health check endpoint

use axum::{Json, extract::State, http::StatusCode};
use tracing::warn;

use crate::api::{state::ApiState, types::HealthResponse};

/// GET /api/v1/health
///
/// 200 while the storage backend answers, 503 otherwise. Never requires a token.
pub async fn health_check(State(state): State<ApiState>) -> (StatusCode, Json<HealthResponse>) {
    let timestamp = chrono::Utc::now();

    match state.hub.backend().health_check().await {
        Ok(health) if health.healthy => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok".to_string(),
                timestamp,
                storage: Some(health),
            }),
        ),
        Ok(health) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "degraded".to_string(),
                timestamp,
                storage: Some(health),
            }),
        ),
        Err(e) => {
            warn!("storage health check failed: {e}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unavailable".to_string(),
                    timestamp,
                    storage: None,
                }),
            )
        }
    }
}
