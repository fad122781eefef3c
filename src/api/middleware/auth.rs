//! Bearer token check for every route except health

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::api::error::{ApiError, ApiResult};

/// Token presented as `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> ApiResult<&str> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| ApiError::Unauthorized("missing Authorization header".to_string()))?;

    value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            ApiError::Unauthorized("expected Authorization: Bearer <token>".to_string())
        })
}

pub async fn require_token(
    State(expected): State<String>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    if bearer_token(request.headers())? != expected {
        debug!(
            "rejected token for {} {}",
            request.method(),
            request.uri().path()
        );
        return Err(ApiError::Forbidden("token not accepted".to_string()));
    }

    Ok(next.run(request).await)
}
