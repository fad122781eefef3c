//! Metric ingestion integration tests
//!
//! - the current-value cache never regresses on out-of-order readings
//! - full history keeps every accepted reading
//! - validation of identifiers, finiteness and configured bounds

use aas_monitor::{error::AasError, storage::ReadingQuery};
use assert_matches::assert_matches;

use crate::helpers::*;

#[tokio::test]
async fn test_older_reading_goes_to_history_only() {
    let hub = create_test_hub();
    create_robot(&hub, "R-47").await;

    let newer = hub
        .ingestor
        .ingest(reading("R-47", "temperature", 45.0, 60))
        .await
        .unwrap();
    assert!(newer.cache_updated);
    assert_eq!(newer.last_modified, 2);

    let older = hub
        .ingestor
        .ingest(reading("R-47", "temperature", 30.0, 0))
        .await
        .unwrap();
    assert!(!older.cache_updated);
    assert_eq!(older.last_modified, 2);

    let asset = hub.repository.get_asset("R-47").await.unwrap();
    let current = asset.current_value("temperature").unwrap();
    assert_eq!(current.value, 45.0);
    assert_eq!(current.timestamp, at(60));

    let history = hub
        .explorer
        .metric_history(&ReadingQuery::for_asset("R-47").metric("temperature"))
        .await
        .unwrap();
    let values: Vec<f64> = history.iter().map(|r| r.value).collect();
    assert_eq!(values, vec![30.0, 45.0]);
}

#[tokio::test]
async fn test_equal_timestamp_replaces_cached_value() {
    let hub = create_test_hub();
    create_robot(&hub, "R-47").await;

    hub.ingestor
        .ingest(reading("R-47", "temperature", 45.0, 10))
        .await
        .unwrap();
    let outcome = hub
        .ingestor
        .ingest(reading("R-47", "temperature", 46.0, 10))
        .await
        .unwrap();
    assert!(outcome.cache_updated);

    let asset = hub.repository.get_asset("R-47").await.unwrap();
    assert_eq!(asset.current_value("temperature").unwrap().value, 46.0);
}

#[tokio::test]
async fn test_unknown_asset_is_not_found() {
    let hub = create_test_hub();
    let result = hub
        .ingestor
        .ingest(reading("ghost", "temperature", 45.0, 0))
        .await;
    assert_matches!(result, Err(AasError::NotFound(_)));
}

#[tokio::test]
async fn test_invalid_values_rejected() {
    let hub = create_test_hub();
    create_robot(&hub, "R-47").await;

    for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
        let result = hub
            .ingestor
            .ingest(reading("R-47", "temperature", value, 0))
            .await;
        assert_matches!(result, Err(AasError::Validation(_)));
    }

    // below absolute zero and above 100 %
    let cold = hub
        .ingestor
        .ingest(reading("R-47", "temperature", -300.0, 0))
        .await;
    assert_matches!(cold, Err(AasError::Validation(_)));

    let efficiency = hub
        .ingestor
        .ingest(reading("R-47", "efficiency", 101.0, 0))
        .await;
    assert_matches!(efficiency, Err(AasError::Validation(_)));

    let empty_metric = hub.ingestor.ingest(reading("R-47", " ", 1.0, 0)).await;
    assert_matches!(empty_metric, Err(AasError::Validation(_)));

    // beyond what a nanosecond timestamp can hold
    let far_future = hub
        .ingestor
        .ingest(reading("R-47", "temperature", 20.0, 400 * 365 * 86_400))
        .await;
    assert_matches!(far_future, Err(AasError::Validation(_)));

    // nothing was stored
    let history = hub
        .explorer
        .metric_history(&ReadingQuery::for_asset("R-47"))
        .await
        .unwrap();
    assert!(history.is_empty());
    let asset = hub.repository.get_asset("R-47").await.unwrap();
    assert_eq!(asset.last_modified, 1);
}

#[tokio::test]
async fn test_unbounded_metric_accepted() {
    let hub = create_test_hub();
    create_robot(&hub, "R-47").await;

    let outcome = hub
        .ingestor
        .ingest(reading("R-47", "vibration", 1e6, 0))
        .await
        .unwrap();
    assert!(outcome.cache_updated);
    assert!(outcome.transitions.is_empty());
}

#[tokio::test]
async fn test_batch_results_are_independent() {
    let hub = create_test_hub();
    create_robot(&hub, "R-47").await;

    let results = hub
        .ingestor
        .ingest_batch(vec![
            reading("R-47", "temperature", 40.0, 0),
            reading("ghost", "temperature", 40.0, 1),
            reading("R-47", "efficiency", 250.0, 2),
            reading("R-47", "temperature", 41.0, 3),
        ])
        .await;

    assert!(results[0].is_ok());
    assert_matches!(results[1], Err(AasError::NotFound(_)));
    assert_matches!(results[2], Err(AasError::Validation(_)));
    assert!(results[3].is_ok());

    let history = hub
        .explorer
        .metric_history(&ReadingQuery::for_asset("R-47"))
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
}

#[tokio::test]
async fn test_reading_history_limit_keeps_most_recent() {
    let hub = create_test_hub();
    create_robot(&hub, "R-47").await;

    for i in 0..10 {
        hub.ingestor
            .ingest(reading("R-47", "temperature", 40.0 + i as f64, i))
            .await
            .unwrap();
    }

    let query = aas_monitor::storage::ReadingQuery {
        limit: Some(3),
        ..ReadingQuery::for_asset("R-47")
    };
    let values: Vec<f64> = hub
        .explorer
        .metric_history(&query)
        .await
        .unwrap()
        .iter()
        .map(|r| r.value)
        .collect();
    assert_eq!(values, vec![47.0, 48.0, 49.0]);
}
