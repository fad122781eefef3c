//! Repository integration tests
//!
//! - create/get round trip
//! - stable listing order and kind filter
//! - optimistic concurrency on `last_modified`
//! - idempotent, cascading delete

use aas_monitor::{
    error::AasError,
    model::{AssetFilter, AssetStatus, NewAsset, Property, PropertyValue, Submodel},
    storage::ReadingQuery,
};
use assert_matches::assert_matches;
use pretty_assertions::assert_eq;

use crate::helpers::*;

#[tokio::test]
async fn test_get_after_create_round_trip() {
    let hub = create_test_hub();
    let spec = robot_spec("R-47");

    let created = hub.repository.create_asset(spec.clone()).await.unwrap();
    let fetched = hub.repository.get_asset("R-47").await.unwrap();

    assert_eq!(created, fetched);
    assert_eq!(fetched.name, spec.name);
    assert_eq!(fetched.kind, spec.kind);
    assert_eq!(fetched.submodels, spec.submodels);
    assert_eq!(fetched.status, AssetStatus::Active);
    assert_eq!(fetched.last_modified, 1);
    assert!(fetched.current.is_empty());
}

#[tokio::test]
async fn test_missing_asset_is_not_found() {
    let hub = create_test_hub();
    assert_matches!(
        hub.repository.get_asset("nope").await,
        Err(AasError::NotFound(_))
    );
}

#[tokio::test]
async fn test_duplicate_property_key_rejected_on_create() {
    let hub = create_test_hub();
    let mut submodel = Submodel::new("Operation", "OperationalData");
    submodel.properties = vec![
        Property::new("Speed", PropertyValue::Number(1.0)),
        Property::new("Speed", PropertyValue::Number(2.0)),
    ];

    let result = hub
        .repository
        .create_asset(NewAsset::new("Robot", "robot").with_submodel(submodel))
        .await;
    assert_matches!(result, Err(AasError::Validation(_)));
}

#[tokio::test]
async fn test_list_order_and_filter() {
    let hub = create_test_hub();
    for id in ["R-01", "R-02"] {
        create_robot(&hub, id).await;
    }
    hub.repository
        .create_asset(NewAsset::new("Conveyor S-01", "conveyor").with_id("S-01"))
        .await
        .unwrap();

    let all = hub
        .repository
        .list_assets(&AssetFilter::default())
        .await
        .unwrap();
    let ids: Vec<&str> = all.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["R-01", "R-02", "S-01"]);

    let robots = hub
        .repository
        .list_assets(&AssetFilter::kind("robot"))
        .await
        .unwrap();
    assert_eq!(robots.len(), 2);
    assert!(robots.iter().all(|s| s.kind == "robot"));
}

#[tokio::test]
async fn test_every_mutation_bumps_revision() {
    let hub = create_test_hub();
    create_robot(&hub, "R-47").await;

    let asset = hub
        .repository
        .upsert_property(
            "R-47",
            "Operation",
            Property::new("Efficiency", PropertyValue::Number(94.5)).with_unit("%"),
            Some(1),
        )
        .await
        .unwrap();
    assert_eq!(asset.last_modified, 2);

    let asset = hub
        .repository
        .upsert_submodel(
            "R-47",
            Submodel::new("Maintenance", "MaintenanceInfo"),
            Some(2),
        )
        .await
        .unwrap();
    assert_eq!(asset.last_modified, 3);
    assert_eq!(asset.submodels.len(), 2);

    let stale = hub
        .repository
        .upsert_submodel("R-47", Submodel::new("Other", "Other"), Some(2))
        .await;
    assert_matches!(stale, Err(AasError::Conflict(_)));

    let stored = hub.repository.get_asset("R-47").await.unwrap();
    assert_eq!(stored.last_modified, 3);
    assert!(stored.submodel("Other").is_none());
}

#[tokio::test]
async fn test_upsert_submodel_on_missing_asset() {
    let hub = create_test_hub();
    let result = hub
        .repository
        .upsert_submodel("ghost", Submodel::new("Operation", "OperationalData"), None)
        .await;
    assert_matches!(result, Err(AasError::NotFound(_)));
}

#[tokio::test]
async fn test_delete_is_idempotent_and_cascades() {
    let hub = create_test_hub();
    let mut spec = robot_spec("R-47");
    spec.maintenance = Some(operating_hours(500.0));
    hub.repository.create_asset(spec).await.unwrap();

    hub.ingestor
        .ingest(reading("R-47", "service_hours", 510.0, 0))
        .await
        .unwrap();
    assert_eq!(hub.alerts.sweep().await.unwrap().failed, 0);

    assert!(hub.repository.delete_asset("R-47").await.unwrap());
    assert!(!hub.repository.delete_asset("R-47").await.unwrap());

    assert_matches!(
        hub.repository.get_asset("R-47").await,
        Err(AasError::NotFound(_))
    );
    let history = hub
        .explorer
        .alert_history(&Default::default(), None, None)
        .await
        .unwrap();
    assert!(history.is_empty());

    // readings are history, they outlive the asset until retention
    let readings = hub
        .explorer
        .metric_history(&ReadingQuery::for_asset("R-47"))
        .await
        .unwrap();
    assert_eq!(readings.len(), 1);
}
