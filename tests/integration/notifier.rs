//! Webhook notifier tests against a mock endpoint

use std::time::Duration;

use aas_monitor::{
    actors::{NotifierHandle, NotifierStats},
    alerting::Severity,
    config::Webhook,
};
use serde_json::Value;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::*;

async fn wait_for_stats(
    handle: &NotifierHandle,
    done: impl Fn(&NotifierStats) -> bool,
) -> NotifierStats {
    for _ in 0..100 {
        let stats = handle.stats().await.unwrap();
        if done(&stats) {
            return stats;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("notifier did not reach the expected state");
}

fn webhook(server: &MockServer) -> Webhook {
    Webhook {
        url: format!("{}/hook", server.uri()),
        min_severity: Some(Severity::High),
    }
}

#[tokio::test]
async fn test_delivers_alerts_at_or_above_min_severity() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let hub = create_test_hub();
    create_robot(&hub, "R-47").await;
    let notifier = NotifierHandle::spawn(webhook(&server), &hub.events);

    // warning first; once the high alert is delivered the warning was seen too
    hub.ingestor
        .ingest(reading("R-47", "efficiency", 80.0, 0))
        .await
        .unwrap();
    hub.ingestor
        .ingest(reading("R-47", "temperature", 65.0, 1))
        .await
        .unwrap();

    let stats = wait_for_stats(&notifier, |s| s.delivered >= 1).await;
    assert_eq!(stats.delivered, 1);
    assert_eq!(stats.failed, 0);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["event"], "alert_raised");
    assert_eq!(body["alert"]["asset_id"], "R-47");
    assert_eq!(body["alert"]["rule_id"], "high-temperature");
    assert!(body["text"].as_str().unwrap().starts_with("[HIGH] R-47"));

    notifier.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_resolution_is_delivered() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let hub = create_test_hub();
    create_robot(&hub, "R-47").await;
    let notifier = NotifierHandle::spawn(webhook(&server), &hub.events);

    hub.ingestor
        .ingest(reading("R-47", "temperature", 65.0, 0))
        .await
        .unwrap();
    hub.ingestor
        .ingest(reading("R-47", "temperature", 40.0, 1))
        .await
        .unwrap();

    wait_for_stats(&notifier, |s| s.delivered >= 2).await;

    let requests = server.received_requests().await.unwrap();
    let events: Vec<String> = requests
        .iter()
        .map(|r| {
            let body: Value = serde_json::from_slice(&r.body).unwrap();
            body["event"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(events, vec!["alert_raised", "alert_resolved"]);

    notifier.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_rejected_delivery_counted_as_failed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let hub = create_test_hub();
    create_robot(&hub, "R-47").await;
    let notifier = NotifierHandle::spawn(webhook(&server), &hub.events);

    let outcome = hub
        .ingestor
        .ingest(reading("R-47", "temperature", 65.0, 0))
        .await
        .unwrap();
    // the alert is stored regardless of delivery
    assert_eq!(outcome.transitions.len(), 1);

    let stats = wait_for_stats(&notifier, |s| s.failed >= 1).await;
    assert_eq!(stats.delivered, 0);
    assert_eq!(stats.failed, 1);

    notifier.shutdown().await.unwrap();
}
