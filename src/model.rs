//! Asset Administration Shell data model
//!
//! An [`Asset`] is the aggregate root: it exclusively owns its submodels, their
//! properties and the current-value cache. [`MetricReading`]s form the asset's
//! append-only history and live outside the aggregate.
//!
//! ## Invariants
//!
//! - asset ids are unique across the repository
//! - submodel ids are unique within their asset
//! - property keys are unique within their submodel
//! - numeric values are always finite

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AasError, AasResult};

/// Maximum length of any identifier (asset, submodel, property key, metric)
pub const MAX_ID_LEN: usize = 256;

/// Default metric reporting elapsed operating hours since the last service
pub const DEFAULT_SERVICE_METRIC: &str = "service_hours";

/// Operational status of an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetStatus {
    #[default]
    Active,
    Maintenance,
    Offline,
    Error,
}

impl AssetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetStatus::Active => "active",
            AssetStatus::Maintenance => "maintenance",
            AssetStatus::Offline => "offline",
            AssetStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AssetStatus {
    type Err = AasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "active" => Ok(AssetStatus::Active),
            "maintenance" => Ok(AssetStatus::Maintenance),
            "offline" => Ok(AssetStatus::Offline),
            "error" => Ok(AssetStatus::Error),
            other => Err(AasError::validation(format!("unknown asset status: {other}"))),
        }
    }
}

/// Latest known value of one metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurrentValue {
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

/// How the service interval of an asset is measured
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MaintenanceInterval {
    /// Due once the operating-hours metric reaches `hours`
    OperatingHours {
        hours: f64,
        #[serde(default = "default_service_metric")]
        metric: String,
    },

    /// Due `days` after the last service (or creation, if never serviced)
    Calendar { days: u32 },
}

fn default_service_metric() -> String {
    DEFAULT_SERVICE_METRIC.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceSchedule {
    pub interval: MaintenanceInterval,

    #[serde(default)]
    pub last_serviced: Option<DateTime<Utc>>,
}

impl MaintenanceSchedule {
    /// Metric whose ingestion may change the maintenance condition
    pub fn metric(&self) -> Option<&str> {
        match &self.interval {
            MaintenanceInterval::OperatingHours { metric, .. } => Some(metric),
            MaintenanceInterval::Calendar { .. } => None,
        }
    }

    fn validate(&self) -> AasResult<()> {
        match &self.interval {
            MaintenanceInterval::OperatingHours { hours, metric } => {
                if !hours.is_finite() || *hours <= 0.0 {
                    return Err(AasError::validation(
                        "maintenance interval hours must be a positive number",
                    ));
                }
                validate_identifier("maintenance metric", metric)
            }
            MaintenanceInterval::Calendar { days } => {
                if *days == 0 {
                    return Err(AasError::validation(
                        "maintenance interval days must be at least 1",
                    ));
                }
                Ok(())
            }
        }
    }
}

/// Typed value of a submodel property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PropertyValue {
    String(String),
    Number(f64),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
}

impl PropertyValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            PropertyValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub key: String,
    pub value: PropertyValue,

    /// Semantic unit, e.g. "°C", "hours", "%"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Property {
    pub fn new(key: impl Into<String>, value: PropertyValue) -> Self {
        Self {
            key: key.into(),
            value,
            unit: None,
            description: None,
            updated_at: Utc::now(),
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn validate(&self) -> AasResult<()> {
        validate_identifier("property key", &self.key)?;
        if let PropertyValue::Number(n) = self.value
            && !n.is_finite()
        {
            return Err(AasError::validation(format!(
                "property {} has a non-finite value",
                self.key
            )));
        }
        Ok(())
    }
}

/// A named, typed group of properties describing one facet of an asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submodel {
    pub id: String,

    /// Kind tag, e.g. "OperationalData" or "MaintenanceInfo"
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub properties: Vec<Property>,
}

impl Submodel {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            description: None,
            properties: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_property(mut self, property: Property) -> Self {
        self.upsert_property(property);
        self
    }

    pub fn property(&self, key: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.key == key)
    }

    /// Replace the property with the same key in place, or append it
    pub fn upsert_property(&mut self, property: Property) {
        match self.properties.iter_mut().find(|p| p.key == property.key) {
            Some(existing) => *existing = property,
            None => self.properties.push(property),
        }
    }

    pub fn validate(&self) -> AasResult<()> {
        validate_identifier("submodel id", &self.id)?;
        if self.kind.trim().is_empty() {
            return Err(AasError::validation(format!(
                "submodel {} is missing a kind",
                self.id
            )));
        }

        let mut keys = HashSet::new();
        for property in &self.properties {
            property.validate()?;
            if !keys.insert(property.key.as_str()) {
                return Err(AasError::validation(format!(
                    "duplicate property key {} in submodel {}",
                    property.key, self.id
                )));
            }
        }
        Ok(())
    }
}

/// An industrial entity (robot, conveyor, ...) with its submodels and live metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: String,
    pub name: String,
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_asset_id: Option<String>,

    pub status: AssetStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Revision counter, bumped by every mutation
    pub last_modified: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance: Option<MaintenanceSchedule>,

    #[serde(default)]
    pub current: BTreeMap<String, CurrentValue>,

    #[serde(default)]
    pub submodels: Vec<Submodel>,
}

impl Asset {
    pub fn submodel(&self, id: &str) -> Option<&Submodel> {
        self.submodels.iter().find(|s| s.id == id)
    }

    pub fn submodel_mut(&mut self, id: &str) -> Option<&mut Submodel> {
        self.submodels.iter_mut().find(|s| s.id == id)
    }

    /// Replace the submodel with the same id in place, or append it
    pub fn upsert_submodel(&mut self, submodel: Submodel) {
        match self.submodel_mut(&submodel.id) {
            Some(existing) => *existing = submodel,
            None => self.submodels.push(submodel),
        }
    }

    pub fn remove_submodel(&mut self, id: &str) -> bool {
        let before = self.submodels.len();
        self.submodels.retain(|s| s.id != id);
        self.submodels.len() < before
    }

    /// Record a mutation: bump the revision and the update time
    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.last_modified += 1;
        self.updated_at = at;
    }

    /// Update the current-value cache from a reading
    ///
    /// Returns `false` (cache untouched) when the reading is older than the
    /// cached value; equal timestamps replace.
    pub fn apply_reading(&mut self, reading: &MetricReading) -> bool {
        if let Some(cached) = self.current.get(&reading.metric)
            && reading.timestamp < cached.timestamp
        {
            return false;
        }
        self.current.insert(
            reading.metric.clone(),
            CurrentValue {
                value: reading.value,
                timestamp: reading.timestamp,
            },
        );
        true
    }

    pub fn current_value(&self, metric: &str) -> Option<CurrentValue> {
        self.current.get(metric).copied()
    }

    pub fn summary(&self) -> AssetSummary {
        AssetSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            kind: self.kind.clone(),
            status: self.status,
            created_at: self.created_at,
            last_modified: self.last_modified,
            submodel_count: self.submodels.len(),
            current: self.current.clone(),
        }
    }

    pub(crate) fn validate(&self) -> AasResult<()> {
        validate_identifier("asset id", &self.id)?;
        if self.name.trim().is_empty() {
            return Err(AasError::validation("asset name must not be empty"));
        }
        if self.kind.trim().is_empty() {
            return Err(AasError::validation("asset kind must not be empty"));
        }
        if let Some(schedule) = &self.maintenance {
            schedule.validate()?;
        }

        let mut ids = HashSet::new();
        for submodel in &self.submodels {
            submodel.validate()?;
            if !ids.insert(submodel.id.as_str()) {
                return Err(AasError::validation(format!(
                    "duplicate submodel id {}",
                    submodel.id
                )));
            }
        }
        Ok(())
    }
}

/// Input for creating an asset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewAsset {
    /// Caller-supplied id; generated when absent
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub kind: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub global_asset_id: Option<String>,

    #[serde(default)]
    pub status: AssetStatus,

    #[serde(default)]
    pub maintenance: Option<MaintenanceSchedule>,

    #[serde(default)]
    pub submodels: Vec<Submodel>,
}

impl NewAsset {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_maintenance(mut self, schedule: MaintenanceSchedule) -> Self {
        self.maintenance = Some(schedule);
        self
    }

    pub fn with_submodel(mut self, submodel: Submodel) -> Self {
        self.submodels.push(submodel);
        self
    }

    /// Build the asset aggregate; validation happens in the repository
    pub(crate) fn into_asset(self, id: String, now: DateTime<Utc>) -> Asset {
        Asset {
            id,
            name: self.name,
            kind: self.kind,
            description: self.description,
            global_asset_id: self.global_asset_id,
            status: self.status,
            created_at: now,
            updated_at: now,
            last_modified: 1,
            maintenance: self.maintenance,
            current: BTreeMap::new(),
            submodels: self.submodels,
        }
    }
}

/// Partial update of asset metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetPatch {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub status: Option<AssetStatus>,

    #[serde(default)]
    pub maintenance: Option<MaintenanceSchedule>,
}

impl AssetPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.maintenance.is_none()
    }

    pub(crate) fn apply(self, asset: &mut Asset) {
        if let Some(name) = self.name {
            asset.name = name;
        }
        if let Some(description) = self.description {
            asset.description = Some(description);
        }
        if let Some(status) = self.status {
            asset.status = status;
        }
        if let Some(maintenance) = self.maintenance {
            asset.maintenance = Some(maintenance);
        }
    }
}

/// Listing entry for an asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetSummary {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub status: AssetStatus,
    pub created_at: DateTime<Utc>,
    pub last_modified: u64,
    pub submodel_count: usize,
    pub current: BTreeMap<String, CurrentValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetFilter {
    #[serde(default)]
    pub kind: Option<String>,

    #[serde(default)]
    pub status: Option<AssetStatus>,
}

impl AssetFilter {
    pub fn kind(kind: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            status: None,
        }
    }

    pub fn matches(&self, asset: &Asset) -> bool {
        self.kind.as_ref().is_none_or(|k| *k == asset.kind)
            && self.status.is_none_or(|s| s == asset.status)
    }
}

/// One immutable entry of an asset's metric time series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricReading {
    pub asset_id: String,
    pub metric: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl MetricReading {
    pub fn new(
        asset_id: impl Into<String>,
        metric: impl Into<String>,
        value: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            asset_id: asset_id.into(),
            metric: metric.into(),
            value,
            timestamp,
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Check that an identifier is usable as a key and as a URL path segment
pub fn validate_identifier(what: &str, id: &str) -> AasResult<()> {
    if id.trim().is_empty() {
        return Err(AasError::validation(format!("{what} must not be empty")));
    }
    if id.len() > MAX_ID_LEN {
        return Err(AasError::validation(format!(
            "{what} exceeds {MAX_ID_LEN} characters"
        )));
    }
    if id
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '/' | '?' | '#'))
    {
        return Err(AasError::validation(format!(
            "{what} contains invalid characters: {id:?}"
        )));
    }
    Ok(())
}
