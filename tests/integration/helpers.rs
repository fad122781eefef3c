//! Test helpers shared by the integration tests

#![allow(dead_code)]

use aas_monitor::{
    Hub,
    alerting::{AlertRule, CompareOp, Severity},
    config::Config,
    model::{
        Asset, MaintenanceInterval, MaintenanceSchedule, MetricReading, NewAsset, Property,
        PropertyValue, Submodel,
    },
    storage::RetryPolicy,
};
use chrono::{DateTime, Duration, TimeZone, Utc};

/// Fixed origin for reading timestamps
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap()
}

pub fn at(offset_secs: i64) -> DateTime<Utc> {
    base_time() + Duration::seconds(offset_secs)
}

pub fn test_config() -> Config {
    Config {
        retry: RetryPolicy::none(),
        ..Config::default()
    }
}

/// Hub over an in-memory backend with the default factory rules
pub fn create_test_hub() -> Hub {
    Hub::in_memory(&test_config()).unwrap()
}

pub fn create_test_hub_with_rules(rules: Vec<AlertRule>) -> Hub {
    Hub::in_memory(&Config {
        rules,
        ..test_config()
    })
    .unwrap()
}

/// Temperature rule with threshold 60 and margin 2
pub fn temperature_rule() -> AlertRule {
    AlertRule::threshold(
        "high-temperature",
        "temperature",
        CompareOp::GreaterThan,
        60.0,
        2.0,
        Severity::High,
    )
}

pub fn operating_hours(hours: f64) -> MaintenanceSchedule {
    MaintenanceSchedule {
        interval: MaintenanceInterval::OperatingHours {
            hours,
            metric: "service_hours".to_string(),
        },
        last_serviced: None,
    }
}

pub fn robot_spec(id: &str) -> NewAsset {
    NewAsset::new(format!("Robot {id}"), "robot")
        .with_id(id)
        .with_submodel(
            Submodel::new("Operation", "OperationalData").with_property(
                Property::new("CurrentTask", PropertyValue::String("welding".to_string())),
            ),
        )
}

pub async fn create_robot(hub: &Hub, id: &str) -> Asset {
    hub.repository.create_asset(robot_spec(id)).await.unwrap()
}

pub fn reading(asset_id: &str, metric: &str, value: f64, offset_secs: i64) -> MetricReading {
    MetricReading::new(asset_id, metric, value, at(offset_secs))
}
