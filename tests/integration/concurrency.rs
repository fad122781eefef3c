//! Concurrency and race condition tests
//!
//! - interleaved ingestion for many assets keeps one active alert per rule
//! - the alerts left behind match ingesting the same readings in timestamp order
//! - the current-value cache ends at the newest reading whatever the order
//! - concurrent creates of one id and revision-guarded writes have one winner

use aas_monitor::{
    alerting::{Alert, AlertStatus},
    error::AasError,
    explorer::AlertFilter,
    model::{Property, PropertyValue},
    storage::ReadingQuery,
};
use assert_matches::assert_matches;
use chrono::{DateTime, Utc};

use crate::helpers::*;

type AlertFacts = (String, AlertStatus, DateTime<Utc>, DateTime<Utc>, Option<DateTime<Utc>>);

/// What two hubs fed the same readings must agree on; ids differ
fn alert_facts(alerts: &[Alert]) -> Vec<AlertFacts> {
    alerts
        .iter()
        .map(|a| {
            (
                a.rule_id.clone(),
                a.status,
                a.first_triggered,
                a.last_seen,
                a.resolved_at,
            )
        })
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_ingestion_no_duplicate_alerts() {
    let hub = create_test_hub_with_rules(vec![temperature_rule()]);
    let ids: Vec<String> = (0..10).map(|i| format!("R-{i:02}")).collect();
    for id in &ids {
        create_robot(&hub, id).await;
    }

    let readings: Vec<_> = ids
        .iter()
        .flat_map(|id| {
            (0..100).map(move |i| {
                let value = if i % 2 == 1 { 70.0 } else { 40.0 };
                reading(id, "temperature", value, i)
            })
        })
        .collect();

    let mut tasks = Vec::new();
    for reading in readings.clone() {
        let hub = hub.clone();
        tasks.push(tokio::spawn(
            async move { hub.ingestor.ingest(reading).await },
        ));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    // same readings, one at a time in timestamp order
    let ordered = create_test_hub_with_rules(vec![temperature_rule()]);
    for id in &ids {
        create_robot(&ordered, id).await;
    }
    for reading in readings {
        ordered.ingestor.ingest(reading).await.unwrap();
    }

    for id in &ids {
        let asset = hub.repository.get_asset(id).await.unwrap();
        let current = asset.current_value("temperature").unwrap();
        assert_eq!(current.value, 70.0);
        assert_eq!(current.timestamp, at(99));

        let active = hub
            .explorer
            .list_active_alerts(&AlertFilter::asset(id.as_str()))
            .await
            .unwrap();
        assert_eq!(active.len(), 1, "{id} should have exactly one active alert");
        assert_eq!(active[0].last_seen, at(99));

        let readings = hub
            .explorer
            .metric_history(&ReadingQuery::for_asset(id.as_str()))
            .await
            .unwrap();
        assert_eq!(readings.len(), 100);

        let history = hub
            .explorer
            .alert_history(&AlertFilter::asset(id.as_str()), None, None)
            .await
            .unwrap();
        let expected = ordered
            .explorer
            .alert_history(&AlertFilter::asset(id.as_str()), None, None)
            .await
            .unwrap();
        assert_eq!(expected.len(), 50);
        assert_eq!(alert_facts(&history), alert_facts(&expected), "{id}");
    }

    assert!(hub.locks().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_create_same_id_single_winner() {
    let hub = create_test_hub();

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let hub = hub.clone();
        tasks.push(tokio::spawn(async move {
            hub.repository.create_asset(robot_spec("R-47")).await
        }));
    }

    let mut created = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => created += 1,
            Err(err) => assert_matches!(err, AasError::Conflict(_)),
        }
    }
    assert_eq!(created, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_revision_guarded_writes_single_winner() {
    let hub = create_test_hub();
    let asset = create_robot(&hub, "R-47").await;
    let revision = asset.last_modified;

    let mut tasks = Vec::new();
    for i in 0..8 {
        let hub = hub.clone();
        tasks.push(tokio::spawn(async move {
            let property = Property::new("Speed", PropertyValue::Number(f64::from(i)));
            hub.repository
                .upsert_property("R-47", "Operation", property, Some(revision))
                .await
        }));
    }

    let mut winners = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(asset) => {
                winners += 1;
                assert_eq!(asset.last_modified, revision + 1);
            }
            Err(err) => assert_matches!(err, AasError::Conflict(_)),
        }
    }
    assert_eq!(winners, 1);

    let stored = hub.repository.get_asset("R-47").await.unwrap();
    assert_eq!(stored.last_modified, revision + 1);
}
