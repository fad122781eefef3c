//! Integration tests for SQLite persistence
//!
//! These tests verify that:
//! - Assets, cached values and alerts survive a restart of the hub
//! - Reading history is queryable after reopening the database
//! - A second hub over the same file sees the committed revision
//! - Stored entities read back equal, down to sub-millisecond timestamps

use std::sync::Arc;

use aas_monitor::{
    Hub,
    alerting::Severity,
    explorer::AlertFilter,
    model::{MetricReading, Property, PropertyValue},
    storage::{ReadingQuery, StorageBackend, sqlite::SqliteBackend},
};
use chrono::Duration;
use pretty_assertions::assert_eq;
use tempfile::tempdir;

use crate::helpers::*;

async fn open_hub(path: &std::path::Path) -> Hub {
    let backend = SqliteBackend::new(path).await.unwrap();
    Hub::new(Arc::new(backend), &test_config()).unwrap()
}

#[tokio::test]
async fn test_state_survives_reopen() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("aas.db");

    let (alert_id, revision) = {
        let hub = open_hub(&db_path).await;
        let mut spec = robot_spec("R-47");
        spec.maintenance = Some(operating_hours(500.0));
        hub.repository.create_asset(spec).await.unwrap();

        hub.repository
            .upsert_property(
                "R-47",
                "Operation",
                Property::new("Efficiency", PropertyValue::Number(94.5)).with_unit("%"),
                None,
            )
            .await
            .unwrap();

        hub.ingestor
            .ingest(reading("R-47", "temperature", 45.0, 0))
            .await
            .unwrap();
        let outcome = hub
            .ingestor
            .ingest(reading("R-47", "service_hours", 510.0, 10))
            .await
            .unwrap();

        let alert_id = outcome.transitions[0].alert.id.clone();
        hub.backend().close().await.unwrap();
        (alert_id, outcome.last_modified)
    };

    let hub = open_hub(&db_path).await;
    let asset = hub.repository.get_asset("R-47").await.unwrap();
    assert_eq!(asset.name, "Robot R-47");
    assert_eq!(asset.last_modified, revision);

    let operation = asset.submodel("Operation").unwrap();
    let keys: Vec<&str> = operation.properties.iter().map(|p| p.key.as_str()).collect();
    assert_eq!(keys, vec!["CurrentTask", "Efficiency"]);
    let efficiency = operation.property("Efficiency").unwrap();
    assert_eq!(efficiency.value, PropertyValue::Number(94.5));
    assert_eq!(efficiency.unit.as_deref(), Some("%"));

    let temperature = asset.current_value("temperature").unwrap();
    assert_eq!(temperature.value, 45.0);
    assert_eq!(temperature.timestamp, at(0));
    assert_eq!(asset.current_value("service_hours").unwrap().timestamp, at(10));

    let active = hub
        .explorer
        .list_active_alerts(&AlertFilter::default())
        .await
        .unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, alert_id);
    assert_eq!(active[0].severity, Severity::MaintenanceDue);
    assert_eq!(active[0].first_triggered, at(10));

    let readings = hub
        .explorer
        .metric_history(&ReadingQuery::for_asset("R-47"))
        .await
        .unwrap();
    assert_eq!(readings.len(), 2);
    assert_eq!(readings[0].metric, "temperature");
    assert_eq!(readings[1].value, 510.0);

    hub.backend().close().await.unwrap();
}

#[tokio::test]
async fn test_resolved_alert_and_delete_persisted() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("aas.db");

    {
        let hub = open_hub(&db_path).await;
        create_robot(&hub, "R-01").await;
        create_robot(&hub, "R-02").await;

        hub.ingestor
            .ingest(reading("R-01", "temperature", 70.0, 0))
            .await
            .unwrap();
        hub.ingestor
            .ingest(reading("R-01", "temperature", 40.0, 5))
            .await
            .unwrap();
        assert!(hub.repository.delete_asset("R-02").await.unwrap());
        hub.backend().close().await.unwrap();
    }

    let hub = open_hub(&db_path).await;
    let ids: Vec<String> = hub
        .repository
        .list_assets(&Default::default())
        .await
        .unwrap()
        .into_iter()
        .map(|summary| summary.id)
        .collect();
    assert_eq!(ids, vec!["R-01".to_string()]);

    let history = hub
        .explorer
        .alert_history(&AlertFilter::asset("R-01"), None, None)
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert!(!history[0].is_active());
    assert_eq!(history[0].resolved_at, Some(at(5)));

    hub.backend().close().await.unwrap();
}

#[tokio::test]
async fn test_created_asset_reads_back_equal() {
    let temp_dir = tempdir().unwrap();
    let hub = open_hub(&temp_dir.path().join("aas.db")).await;

    let mut spec = robot_spec("R-47");
    spec.maintenance = Some(operating_hours(500.0));
    let created = hub.repository.create_asset(spec).await.unwrap();
    let fetched = hub.repository.get_asset("R-47").await.unwrap();
    assert_eq!(created, fetched);

    let updated = hub
        .repository
        .upsert_property(
            "R-47",
            "Operation",
            Property::new("Efficiency", PropertyValue::Number(94.5)),
            Some(created.last_modified),
        )
        .await
        .unwrap();
    assert_eq!(updated, hub.repository.get_asset("R-47").await.unwrap());

    hub.backend().close().await.unwrap();
}

#[tokio::test]
async fn test_sub_millisecond_order_kept() {
    let temp_dir = tempdir().unwrap();
    let hub = open_hub(&temp_dir.path().join("aas.db")).await;
    create_robot(&hub, "R-47").await;

    let later = base_time() + Duration::microseconds(700);
    let earlier = base_time() + Duration::microseconds(300);

    let first = hub
        .ingestor
        .ingest(MetricReading::new("R-47", "temperature", 50.0, later))
        .await
        .unwrap();
    assert!(first.cache_updated);

    let second = hub
        .ingestor
        .ingest(MetricReading::new("R-47", "temperature", 40.0, earlier))
        .await
        .unwrap();
    assert!(!second.cache_updated);

    let asset = hub.repository.get_asset("R-47").await.unwrap();
    let current = asset.current_value("temperature").unwrap();
    assert_eq!(current.value, 50.0);
    assert_eq!(current.timestamp, later);

    let readings = hub
        .explorer
        .metric_history(&ReadingQuery::for_asset("R-47"))
        .await
        .unwrap();
    let stamps: Vec<_> = readings.iter().map(|r| r.timestamp).collect();
    assert_eq!(stamps, vec![earlier, later]);

    hub.backend().close().await.unwrap();
}
