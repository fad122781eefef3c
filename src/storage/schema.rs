//! Records exchanged with storage backends
//!
//! The asset aggregate, readings and alerts are persisted as-is (see
//! [`crate::model`] and [`crate::alerting`]); this module holds the write units
//! and queries that only make sense at the storage seam.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::alerting::Alert;
use crate::model::{CurrentValue, MetricReading};

/// Everything one ingestion writes, committed in a single transaction
#[derive(Debug, Clone)]
pub struct IngestionCommit {
    pub reading: MetricReading,

    /// New cache entry for `reading.metric`; `None` when the reading was older
    pub current: Option<CurrentValue>,

    /// Asset revision after the ingestion
    pub last_modified: u64,
    pub updated_at: DateTime<Utc>,

    /// Raised, refreshed and resolved alerts
    pub alerts: Vec<Alert>,

    /// Alert ids to delete before `alerts` are written
    pub removed_alerts: Vec<String>,
}

/// Query over an asset's reading history
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReadingQuery {
    pub asset_id: String,

    #[serde(default)]
    pub metric: Option<String>,

    /// Start of time range (inclusive)
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,

    /// End of time range (inclusive)
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,

    /// Keep only the most recent `limit` readings
    #[serde(default)]
    pub limit: Option<usize>,
}

impl ReadingQuery {
    pub fn for_asset(asset_id: impl Into<String>) -> Self {
        Self {
            asset_id: asset_id.into(),
            ..Self::default()
        }
    }

    pub fn metric(mut self, metric: impl Into<String>) -> Self {
        self.metric = Some(metric.into());
        self
    }

    pub fn matches(&self, reading: &MetricReading) -> bool {
        reading.asset_id == self.asset_id
            && self.metric.as_ref().is_none_or(|m| *m == reading.metric)
            && self.start.is_none_or(|start| reading.timestamp >= start)
            && self.end.is_none_or(|end| reading.timestamp <= end)
    }
}

/// What history to drop; `None` disables a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    #[serde(default = "default_max_age_days")]
    pub max_age_days: Option<u32>,

    /// Per asset and metric
    #[serde(default = "default_max_readings")]
    pub max_readings_per_metric: Option<usize>,

    #[serde(default = "default_resolved_alert_days")]
    pub resolved_alert_days: Option<u32>,
}

fn default_max_age_days() -> Option<u32> {
    Some(30)
}

fn default_max_readings() -> Option<usize> {
    Some(10_000)
}

fn default_resolved_alert_days() -> Option<u32> {
    Some(90)
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_age_days: default_max_age_days(),
            max_readings_per_metric: default_max_readings(),
            resolved_alert_days: default_resolved_alert_days(),
        }
    }
}

impl RetentionPolicy {
    pub fn reading_cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.max_age_days
            .map(|days| now - Duration::days(i64::from(days)))
    }

    pub fn alert_cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.resolved_alert_days
            .map(|days| now - Duration::days(i64::from(days)))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionOutcome {
    pub readings_deleted: u64,
    pub alerts_deleted: u64,
}
