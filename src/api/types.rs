//! Request and response bodies of the REST API
//!
//! Domain types (assets, alerts, readings) are serialized as-is; this module
//! only holds the shapes that exist at the HTTP boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::alerting::Severity;
use crate::explorer::AlertFilter;
use crate::ingest::IngestOutcome;
use crate::model::{MetricReading, PropertyValue};
use crate::storage::{HealthStatus, ReadingQuery};

/// Response for GET /api/v1/health
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<HealthStatus>,
}

/// Body of PUT /api/v1/assets/:id/submodels/:submodel_id/properties/:key
#[derive(Debug, Clone, Deserialize)]
pub struct PropertyBody {
    pub value: PropertyValue,

    #[serde(default)]
    pub unit: Option<String>,

    #[serde(default)]
    pub description: Option<String>,
}

/// Body of POST /api/v1/assets/:id/readings
#[derive(Debug, Clone, Deserialize)]
pub struct ReadingBody {
    pub metric: String,
    pub value: f64,

    /// Observation time; defaults to the time of receipt
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,

    #[serde(default)]
    pub source: Option<String>,
}

impl ReadingBody {
    pub fn into_reading(self, asset_id: String) -> MetricReading {
        MetricReading {
            asset_id,
            metric: self.metric,
            value: self.value,
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            source: self.source,
        }
    }
}

/// Per-item result of POST /api/v1/readings/batch
#[derive(Debug, Clone, Serialize)]
pub struct BatchItem {
    pub index: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<IngestOutcome>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchResponse {
    pub accepted: usize,
    pub rejected: usize,
    pub results: Vec<BatchItem>,
}

/// Body of POST /api/v1/assets/:id/service
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceBody {
    #[serde(default)]
    pub serviced_at: Option<DateTime<Utc>>,
}

/// Body of POST /api/v1/alerts/:id/acknowledge
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AcknowledgeBody {
    #[serde(default)]
    pub by: Option<String>,
}

/// Query of GET /api/v1/assets/:id/readings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReadingParams {
    pub metric: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl ReadingParams {
    pub fn into_query(self, asset_id: String) -> ReadingQuery {
        ReadingQuery {
            asset_id,
            metric: self.metric,
            start: self.start,
            end: self.end,
            limit: self.limit,
        }
    }
}

/// Query of GET /api/v1/alerts/history
///
/// Spelled out instead of flattening [`AlertFilter`], query strings only carry text.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryParams {
    pub asset_id: Option<String>,
    pub rule_id: Option<String>,
    pub min_severity: Option<Severity>,
    pub acknowledged: Option<bool>,
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl HistoryParams {
    pub fn filter(&self) -> AlertFilter {
        AlertFilter {
            asset_id: self.asset_id.clone(),
            rule_id: self.rule_id.clone(),
            min_severity: self.min_severity,
            acknowledged: self.acknowledged,
        }
    }
}

/// Query of WS /api/v1/stream
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamParams {
    /// Only forward events of this asset
    pub asset_id: Option<String>,
}
