//! REST API and WebSocket server of the hub
//!
//! ## Endpoints
//!
//! - `GET /api/v1/health` - Storage health, no token required
//! - `GET /api/v1/stats` - Storage statistics and uptime
//! - `GET /api/v1/overview` - Fleet-wide dashboard figures
//! - `GET|POST /api/v1/assets` - List and create assets
//! - `GET|PATCH|DELETE /api/v1/assets/:id` - One asset with its active alerts
//! - `PUT|DELETE /api/v1/assets/:id/submodels/:submodel_id` - Submodels
//! - `PUT /api/v1/assets/:id/submodels/:submodel_id/properties/:key` - Properties
//! - `GET|POST /api/v1/assets/:id/readings` - Reading history and ingestion
//! - `POST /api/v1/assets/:id/service` - Record a maintenance service
//! - `POST /api/v1/readings/batch` - Ingest many readings
//! - `GET /api/v1/alerts` - Active alerts
//! - `GET /api/v1/alerts/history` - Active and resolved alerts
//! - `POST /api/v1/alerts/:id/acknowledge` - Acknowledge an alert
//! - `POST /api/v1/alerts/sweep` - Re-evaluate all assets now
//! - `WS /api/v1/stream` - Real-time event stream

pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod types;
pub mod websocket;

pub use error::{ApiError, ApiResult};
pub use state::ApiState;

use std::net::SocketAddr;

use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ApiConfig;

/// Build the router; every route but health requires `token` when one is set
pub fn build_router(state: ApiState, token: Option<String>) -> Router {
    let mut protected = Router::new()
        .route("/api/v1/stats", get(routes::stats::get_stats))
        .route("/api/v1/overview", get(routes::stats::get_overview))
        .route(
            "/api/v1/assets",
            get(routes::assets::list_assets).post(routes::assets::create_asset),
        )
        .route(
            "/api/v1/assets/:id",
            get(routes::assets::get_asset)
                .patch(routes::assets::update_asset)
                .delete(routes::assets::delete_asset),
        )
        .route(
            "/api/v1/assets/:id/submodels/:submodel_id",
            put(routes::assets::put_submodel).delete(routes::assets::delete_submodel),
        )
        .route(
            "/api/v1/assets/:id/submodels/:submodel_id/properties/:key",
            put(routes::assets::put_property),
        )
        .route(
            "/api/v1/assets/:id/readings",
            get(routes::assets::get_readings).post(routes::assets::post_reading),
        )
        .route(
            "/api/v1/assets/:id/service",
            post(routes::assets::record_service),
        )
        .route(
            "/api/v1/readings/batch",
            post(routes::assets::post_readings_batch),
        )
        .route("/api/v1/alerts", get(routes::alerts::list_active_alerts))
        .route("/api/v1/alerts/history", get(routes::alerts::alert_history))
        .route("/api/v1/alerts/sweep", post(routes::alerts::sweep))
        .route(
            "/api/v1/alerts/:id/acknowledge",
            post(routes::alerts::acknowledge_alert),
        )
        .route("/api/v1/stream", get(websocket::websocket_handler));

    if let Some(token) = token {
        protected = protected.route_layer(axum::middleware::from_fn_with_state(
            token,
            middleware::auth::require_token,
        ));
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(routes::health::health_check))
        .merge(protected)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Spawn the API server
///
/// Starts an Axum HTTP server in a background task and returns its local address.
pub async fn spawn_api_server(config: &ApiConfig, state: ApiState) -> anyhow::Result<SocketAddr> {
    info!("starting API server on {}", config.bind);

    let app = build_router(state, config.token.clone());

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    let addr = listener.local_addr()?;

    info!("API server listening on {}", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok(addr)
}
