//! Demo factory assets: welding robot R-47 and conveyor line L-01

use chrono::{DateTime, TimeZone, Utc};
use tracing::{info, warn};

use crate::error::{AasError, AasResult};
use crate::model::{
    AssetFilter, AssetStatus, DEFAULT_SERVICE_METRIC, MaintenanceInterval, MaintenanceSchedule,
    NewAsset, Property, PropertyValue, Submodel,
};
use crate::repository::AasRepository;

pub const ROBOT_ID: &str = "urn:aas:robot:R47";
pub const CONVEYOR_ID: &str = "urn:aas:conveyor:L01";

fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 10, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

fn number(key: &str, value: f64) -> Property {
    Property::new(key, PropertyValue::Number(value))
}

pub fn sample_assets() -> Vec<NewAsset> {
    let last_service = at(2024, 9, 15);

    let robot = NewAsset {
        description: Some("Industrial Welding Robot KUKA KR-150".to_string()),
        global_asset_id: Some("https://factory.example.com/assets/robot/R47".to_string()),
        ..NewAsset::new("Robot R-47", "robot")
    }
    .with_id(ROBOT_ID)
    .with_maintenance(MaintenanceSchedule {
        interval: MaintenanceInterval::OperatingHours {
            hours: 2000.0,
            metric: DEFAULT_SERVICE_METRIC.to_string(),
        },
        last_serviced: Some(last_service),
    })
    .with_submodel(
        Submodel::new("urn:submodel:maintenance:R47", "MaintenanceInfo")
            .with_description("Maintenance schedule and history")
            .with_property(
                Property::new("LastService", PropertyValue::Timestamp(last_service))
                    .with_description("Last maintenance service date"),
            )
            .with_property(
                Property::new("NextService", PropertyValue::Timestamp(at(2024, 12, 15)))
                    .with_description("Next scheduled maintenance"),
            )
            .with_property(
                number("ServiceHours", 2100.0)
                    .with_unit("hours")
                    .with_description("Operating hours since last service"),
            ),
    )
    .with_submodel(
        Submodel::new("urn:submodel:operation:R47", "OperationalData")
            .with_description("Current operational parameters")
            .with_property(
                Property::new("CurrentTask", PropertyValue::String("welding".to_string()))
                    .with_description("Current operation task"),
            )
            .with_property(
                number("Efficiency", 94.5)
                    .with_unit("%")
                    .with_description("Current operational efficiency percentage"),
            )
            .with_property(
                number("Temperature", 42.3)
                    .with_unit("°C")
                    .with_description("Motor temperature in Celsius"),
            ),
    );

    let conveyor = NewAsset {
        description: Some("Main Assembly Conveyor Line".to_string()),
        global_asset_id: Some("https://factory.example.com/assets/conveyor/L01".to_string()),
        status: AssetStatus::Maintenance,
        ..NewAsset::new("Conveyor L-01", "conveyor")
    }
    .with_id(CONVEYOR_ID)
    .with_submodel(
        Submodel::new("urn:submodel:operation:L01", "OperationalData")
            .with_description("Conveyor operational status")
            .with_property(
                number("Speed", 0.0)
                    .with_unit("m/min")
                    .with_description("Current belt speed"),
            )
            .with_property(number("Load", 0.0).with_description("Current load items count")),
    );

    vec![robot, conveyor]
}

/// Create the sample assets if the repository is empty; returns how many were created
pub async fn seed_sample_data(repository: &AasRepository) -> AasResult<usize> {
    let existing = repository.list_assets(&AssetFilter::default()).await?;
    if !existing.is_empty() {
        info!("found {} existing assets in repository", existing.len());
        return Ok(0);
    }

    let mut created = 0;
    for spec in sample_assets() {
        let name = spec.name.clone();
        match repository.create_asset(spec).await {
            Ok(asset) => {
                info!("created sample asset {} ({})", name, asset.id);
                created += 1;
            }
            // raced with another writer
            Err(AasError::Conflict(msg)) => warn!("skipping sample asset {name}: {msg}"),
            Err(err) => return Err(err),
        }
    }
    Ok(created)
}
