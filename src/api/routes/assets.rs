//! Asset, submodel, property and reading endpoints
//!
//! Mutations honour an optional `If-Match: "<last_modified>"` header and every
//! asset response carries the current revision as its `ETag`.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::debug;

use crate::api::{
    error::{ApiError, ApiResult},
    state::ApiState,
    types::{BatchItem, BatchResponse, PropertyBody, ReadingBody, ReadingParams, ServiceBody},
};
use crate::ingest::IngestOutcome;
use crate::model::{Asset, AssetFilter, AssetPatch, MetricReading, NewAsset, Property, Submodel};

/// Upper limit of readings per batch request
pub const MAX_BATCH_SIZE: usize = 1000;

/// Revision from `If-Match`; absent or `*` means unconditional
pub fn expected_revision(headers: &HeaderMap) -> ApiResult<Option<u64>> {
    let Some(value) = headers.get(header::IF_MATCH) else {
        return Ok(None);
    };
    let raw = value
        .to_str()
        .map_err(|_| ApiError::InvalidRequest("If-Match header is not valid text".to_string()))?;

    let tag = raw.trim().trim_start_matches("W/").trim_matches('"');
    if tag == "*" {
        return Ok(None);
    }
    tag.parse()
        .map(Some)
        .map_err(|_| ApiError::InvalidRequest(format!("If-Match is not a revision: {raw}")))
}

fn with_etag<T: Serialize>(status: StatusCode, last_modified: u64, body: T) -> Response {
    (
        status,
        [(header::ETAG, format!("\"{last_modified}\""))],
        Json(body),
    )
        .into_response()
}

fn asset_response(asset: Asset) -> Response {
    with_etag(StatusCode::OK, asset.last_modified, asset)
}

/// GET /api/v1/assets?kind=&status=
pub async fn list_assets(
    State(state): State<ApiState>,
    Query(filter): Query<AssetFilter>,
) -> ApiResult<Response> {
    let assets = state.hub.explorer.list_assets(&filter).await?;
    Ok(Json(serde_json::json!({
        "count": assets.len(),
        "assets": assets,
    }))
    .into_response())
}

/// POST /api/v1/assets
pub async fn create_asset(
    State(state): State<ApiState>,
    Json(spec): Json<NewAsset>,
) -> ApiResult<Response> {
    let asset = state.hub.repository.create_asset(spec).await?;
    Ok(with_etag(StatusCode::CREATED, asset.last_modified, asset))
}

/// GET /api/v1/assets/:id
///
/// The asset with its active alerts
pub async fn get_asset(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let detail = state.hub.explorer.get_asset_detail(&id).await?;
    Ok(with_etag(StatusCode::OK, detail.asset.last_modified, detail))
}

/// PATCH /api/v1/assets/:id
pub async fn update_asset(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(patch): Json<AssetPatch>,
) -> ApiResult<Response> {
    let expected = expected_revision(&headers)?;
    let asset = state.hub.repository.update_asset(&id, patch, expected).await?;
    Ok(asset_response(asset))
}

/// DELETE /api/v1/assets/:id
///
/// 204 whether or not the asset existed
pub async fn delete_asset(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    if !state.hub.repository.delete_asset(&id).await? {
        debug!("delete of absent asset {id}");
    }
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/assets/:id/submodels/:submodel_id
pub async fn put_submodel(
    State(state): State<ApiState>,
    Path((id, submodel_id)): Path<(String, String)>,
    headers: HeaderMap,
    Json(submodel): Json<Submodel>,
) -> ApiResult<Response> {
    if submodel.id != submodel_id {
        return Err(ApiError::InvalidRequest(format!(
            "submodel id {} does not match path {submodel_id}",
            submodel.id
        )));
    }

    let expected = expected_revision(&headers)?;
    let asset = state
        .hub
        .repository
        .upsert_submodel(&id, submodel, expected)
        .await?;
    Ok(asset_response(asset))
}

/// DELETE /api/v1/assets/:id/submodels/:submodel_id
pub async fn delete_submodel(
    State(state): State<ApiState>,
    Path((id, submodel_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let expected = expected_revision(&headers)?;
    let asset = state
        .hub
        .repository
        .delete_submodel(&id, &submodel_id, expected)
        .await?;
    Ok(asset_response(asset))
}

/// PUT /api/v1/assets/:id/submodels/:submodel_id/properties/:key
pub async fn put_property(
    State(state): State<ApiState>,
    Path((id, submodel_id, key)): Path<(String, String, String)>,
    headers: HeaderMap,
    Json(body): Json<PropertyBody>,
) -> ApiResult<Response> {
    let mut property = Property::new(key, body.value);
    property.unit = body.unit;
    property.description = body.description;

    let expected = expected_revision(&headers)?;
    let asset = state
        .hub
        .repository
        .upsert_property(&id, &submodel_id, property, expected)
        .await?;
    Ok(asset_response(asset))
}

/// POST /api/v1/assets/:id/readings
pub async fn post_reading(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(body): Json<ReadingBody>,
) -> ApiResult<Json<IngestOutcome>> {
    let outcome = state.hub.ingestor.ingest(body.into_reading(id)).await?;
    Ok(Json(outcome))
}

/// POST /api/v1/readings/batch
///
/// Each reading is accepted or rejected on its own; the response lists
/// the outcome per input index.
pub async fn post_readings_batch(
    State(state): State<ApiState>,
    Json(readings): Json<Vec<MetricReading>>,
) -> ApiResult<Json<BatchResponse>> {
    if readings.len() > MAX_BATCH_SIZE {
        return Err(ApiError::InvalidRequest(format!(
            "batch of {} readings exceeds the limit of {MAX_BATCH_SIZE}",
            readings.len()
        )));
    }

    let results: Vec<BatchItem> = state
        .hub
        .ingestor
        .ingest_batch(readings)
        .await
        .into_iter()
        .enumerate()
        .map(|(index, result)| match result {
            Ok(outcome) => BatchItem {
                index,
                outcome: Some(outcome),
                error: None,
                kind: None,
            },
            Err(err) => BatchItem {
                index,
                outcome: None,
                kind: Some(err.kind()),
                error: Some(err.to_string()),
            },
        })
        .collect();

    let accepted = results.iter().filter(|item| item.outcome.is_some()).count();
    Ok(Json(BatchResponse {
        accepted,
        rejected: results.len() - accepted,
        results,
    }))
}

/// GET /api/v1/assets/:id/readings?metric=&start=&end=&limit=
pub async fn get_readings(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Query(params): Query<ReadingParams>,
) -> ApiResult<Response> {
    let query = params.into_query(id);
    let readings = state.hub.explorer.metric_history(&query).await?;
    Ok(Json(serde_json::json!({
        "asset_id": query.asset_id,
        "count": readings.len(),
        "readings": readings,
    }))
    .into_response())
}

/// POST /api/v1/assets/:id/service
///
/// Record a maintenance service, restarting the asset's interval
pub async fn record_service(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Option<Json<ServiceBody>>,
) -> ApiResult<Response> {
    let expected = expected_revision(&headers)?;
    let body = body.map(|Json(body)| body).unwrap_or_default();
    let asset = state
        .hub
        .alerts
        .record_service(&id, body.serviced_at, expected)
        .await?;
    Ok(asset_response(asset))
}
