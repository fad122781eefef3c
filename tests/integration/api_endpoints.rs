//! Integration tests for API endpoints
//!
//! These tests verify that:
//! - REST endpoints return the documented status codes and bodies
//! - Authentication middleware protects everything but health
//! - If-Match revisions are enforced
//! - WebSocket streaming forwards domain events

use std::net::SocketAddr;
use std::time::Duration;

use aas_monitor::{
    Hub,
    api::{ApiState, spawn_api_server},
    config::ApiConfig,
};
use axum::http::StatusCode;
use futures::StreamExt;
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite::{Message, client::IntoClientRequest};

use crate::helpers::*;

const TOKEN: &str = "test-token";

async fn spawn_test_api(hub: Hub) -> SocketAddr {
    let config = ApiConfig {
        bind: "127.0.0.1:0".parse().unwrap(),
        token: Some(TOKEN.to_string()),
    };
    spawn_api_server(&config, ApiState::new(hub)).await.unwrap()
}

fn url(addr: SocketAddr, path: &str) -> String {
    format!("http://{addr}{path}")
}

fn robot_body(id: &str) -> Value {
    json!({
        "id": id,
        "name": format!("Robot {id}"),
        "kind": "robot",
        "submodels": [{ "id": "Operation", "kind": "OperationalData" }],
    })
}

#[tokio::test]
async fn test_health_needs_no_token() {
    let addr = spawn_test_api(create_test_hub()).await;

    let response = reqwest::get(url(addr, "/api/v1/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json: Value = response.json().await.unwrap();
    assert_eq!(json["status"], "ok");
    assert!(json["timestamp"].is_string());
    assert_eq!(json["storage"]["healthy"], true);
}

#[tokio::test]
async fn test_auth_required_on_protected_routes() {
    let addr = spawn_test_api(create_test_hub()).await;
    let client = reqwest::Client::new();

    let missing = client.get(url(addr, "/api/v1/stats")).send().await.unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
    let json: Value = missing.json().await.unwrap();
    assert_eq!(json["kind"], "unauthorized");

    let malformed = client
        .get(url(addr, "/api/v1/stats"))
        .header("Authorization", TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(malformed.status(), StatusCode::UNAUTHORIZED);

    let wrong = client
        .get(url(addr, "/api/v1/stats"))
        .bearer_auth("wrong-token")
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::FORBIDDEN);

    let ok = client
        .get(url(addr, "/api/v1/stats"))
        .bearer_auth(TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(ok.status(), StatusCode::OK);
    let json: Value = ok.json().await.unwrap();
    assert_eq!(json["rules"], 5);
    assert!(json["storage"].as_str().unwrap().starts_with("in-memory"));
}

#[tokio::test]
async fn test_asset_lifecycle() {
    let addr = spawn_test_api(create_test_hub()).await;
    let client = reqwest::Client::new();

    let created = client
        .post(url(addr, "/api/v1/assets"))
        .bearer_auth(TOKEN)
        .json(&robot_body("R-47"))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);
    assert_eq!(created.headers()["etag"], "\"1\"");

    let duplicate = client
        .post(url(addr, "/api/v1/assets"))
        .bearer_auth(TOKEN)
        .json(&robot_body("R-47"))
        .send()
        .await
        .unwrap();
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);
    let json: Value = duplicate.json().await.unwrap();
    assert_eq!(json["kind"], "conflict");

    let updated = client
        .put(url(
            addr,
            "/api/v1/assets/R-47/submodels/Operation/properties/Efficiency",
        ))
        .bearer_auth(TOKEN)
        .header("If-Match", "\"1\"")
        .json(&json!({ "value": { "type": "number", "value": 94.5 }, "unit": "%" }))
        .send()
        .await
        .unwrap();
    assert_eq!(updated.status(), StatusCode::OK);
    assert_eq!(updated.headers()["etag"], "\"2\"");

    let stale = client
        .put(url(addr, "/api/v1/assets/R-47/submodels/Operation"))
        .bearer_auth(TOKEN)
        .header("If-Match", "\"1\"")
        .json(&json!({ "id": "Operation", "kind": "OperationalData" }))
        .send()
        .await
        .unwrap();
    assert_eq!(stale.status(), StatusCode::CONFLICT);

    let mismatched = client
        .put(url(addr, "/api/v1/assets/R-47/submodels/Operation"))
        .bearer_auth(TOKEN)
        .json(&json!({ "id": "Maintenance", "kind": "MaintenanceInfo" }))
        .send()
        .await
        .unwrap();
    assert_eq!(mismatched.status(), StatusCode::BAD_REQUEST);

    let detail = client
        .get(url(addr, "/api/v1/assets/R-47"))
        .bearer_auth(TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(detail.status(), StatusCode::OK);
    let json: Value = detail.json().await.unwrap();
    assert_eq!(json["id"], "R-47");
    assert_eq!(json["last_modified"], 2);
    assert_eq!(
        json["submodels"][0]["properties"][0]["value"]["value"],
        94.5
    );
    assert_eq!(json["active_alerts"], json!([]));

    let list = client
        .get(url(addr, "/api/v1/assets?kind=robot"))
        .bearer_auth(TOKEN)
        .send()
        .await
        .unwrap();
    let json: Value = list.json().await.unwrap();
    assert_eq!(json["count"], 1);

    for _ in 0..2 {
        let deleted = client
            .delete(url(addr, "/api/v1/assets/R-47"))
            .bearer_auth(TOKEN)
            .send()
            .await
            .unwrap();
        assert_eq!(deleted.status(), StatusCode::NO_CONTENT);
    }

    let missing = client
        .get(url(addr, "/api/v1/assets/R-47"))
        .bearer_auth(TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    let json: Value = missing.json().await.unwrap();
    assert_eq!(json["kind"], "not_found");
}

#[tokio::test]
async fn test_readings_and_alerts() {
    let hub = create_test_hub();
    create_robot(&hub, "R-47").await;
    let addr = spawn_test_api(hub).await;
    let client = reqwest::Client::new();

    let rejected = client
        .post(url(addr, "/api/v1/assets/R-47/readings"))
        .bearer_auth(TOKEN)
        .json(&json!({ "metric": "efficiency", "value": 150.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);
    let json: Value = rejected.json().await.unwrap();
    assert_eq!(json["kind"], "validation");

    let accepted = client
        .post(url(addr, "/api/v1/assets/R-47/readings"))
        .bearer_auth(TOKEN)
        .json(&json!({
            "metric": "temperature",
            "value": 70.0,
            "timestamp": at(0),
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(accepted.status(), StatusCode::OK);
    let json: Value = accepted.json().await.unwrap();
    assert_eq!(json["cache_updated"], true);
    assert_eq!(json["transitions"][0]["kind"], "raised");

    let readings = client
        .get(url(addr, "/api/v1/assets/R-47/readings?metric=temperature"))
        .bearer_auth(TOKEN)
        .send()
        .await
        .unwrap();
    let json: Value = readings.json().await.unwrap();
    assert_eq!(json["count"], 1);
    assert_eq!(json["readings"][0]["value"], 70.0);

    let alerts = client
        .get(url(addr, "/api/v1/alerts?min_severity=high"))
        .bearer_auth(TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(alerts.status(), StatusCode::OK);
    let json: Value = alerts.json().await.unwrap();
    assert_eq!(json["count"], 1);
    assert_eq!(json["alerts"][0]["severity"], "high");
    let alert_id = json["alerts"][0]["id"].as_str().unwrap().to_string();

    let acked = client
        .post(url(addr, &format!("/api/v1/alerts/{alert_id}/acknowledge")))
        .bearer_auth(TOKEN)
        .json(&json!({ "by": "operator" }))
        .send()
        .await
        .unwrap();
    assert_eq!(acked.status(), StatusCode::OK);
    let json: Value = acked.json().await.unwrap();
    assert_eq!(json["acknowledged_by"], "operator");
    assert_eq!(json["status"], "active");

    let missing = client
        .post(url(addr, "/api/v1/alerts/unknown/acknowledge"))
        .bearer_auth(TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let sweep = client
        .post(url(addr, "/api/v1/alerts/sweep"))
        .bearer_auth(TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(sweep.status(), StatusCode::OK);
    let json: Value = sweep.json().await.unwrap();
    assert_eq!(json["assets_evaluated"], 1);
    assert_eq!(json["failed"], 0);

    let overview = client
        .get(url(addr, "/api/v1/overview"))
        .bearer_auth(TOKEN)
        .send()
        .await
        .unwrap();
    let json: Value = overview.json().await.unwrap();
    assert_eq!(json["total_assets"], 1);
    assert_eq!(json["active_alerts"], 1);
    assert_eq!(json["unacknowledged_alerts"], 0);
}

#[tokio::test]
async fn test_batch_reports_each_reading() {
    let hub = create_test_hub();
    create_robot(&hub, "R-47").await;
    let addr = spawn_test_api(hub).await;

    let response = reqwest::Client::new()
        .post(url(addr, "/api/v1/readings/batch"))
        .bearer_auth(TOKEN)
        .json(&json!([
            { "asset_id": "R-47", "metric": "temperature", "value": 41.0, "timestamp": at(0) },
            { "asset_id": "ghost", "metric": "temperature", "value": 41.0, "timestamp": at(1) },
            { "asset_id": "R-47", "metric": "efficiency", "value": -5.0, "timestamp": at(2) },
        ]))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json: Value = response.json().await.unwrap();
    assert_eq!(json["accepted"], 1);
    assert_eq!(json["rejected"], 2);
    assert!(json["results"][0]["outcome"].is_object());
    assert_eq!(json["results"][1]["kind"], "not_found");
    assert_eq!(json["results"][2]["kind"], "validation");
}

#[tokio::test]
async fn test_stream_forwards_events_for_asset() {
    let hub = create_test_hub();
    create_robot(&hub, "R-01").await;
    create_robot(&hub, "R-47").await;
    let addr = spawn_test_api(hub.clone()).await;

    let mut request = format!("ws://{addr}/api/v1/stream?asset_id=R-47")
        .into_client_request()
        .unwrap();
    request.headers_mut().insert(
        "Authorization",
        format!("Bearer {TOKEN}").parse().unwrap(),
    );
    let (mut socket, _) = tokio_tungstenite::connect_async(request).await.unwrap();

    // the server subscribes after the upgrade completes
    tokio::time::sleep(Duration::from_millis(100)).await;

    hub.ingestor
        .ingest(reading("R-01", "temperature", 40.0, 0))
        .await
        .unwrap();
    hub.ingestor
        .ingest(reading("R-47", "temperature", 41.0, 1))
        .await
        .unwrap();

    let message = tokio::time::timeout(Duration::from_secs(5), socket.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let Message::Text(text) = message else {
        panic!("expected a text frame, got {message:?}");
    };
    let event: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(event["event"], "reading_ingested");
    assert_eq!(event["reading"]["asset_id"], "R-47");
    assert_eq!(event["reading"]["value"], 41.0);
}
