//! Alert records produced by the engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AasError;

use super::rule::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
    Resolved,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Active => "active",
            AlertStatus::Resolved => "resolved",
        }
    }
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub rule_id: String,
    pub asset_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<String>,

    pub severity: Severity,
    pub message: String,
    pub triggering_value: f64,
    pub first_triggered: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub status: AlertStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledged_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledged_by: Option<String>,
}

impl Alert {
    pub(crate) fn raise(
        rule_id: &str,
        asset_id: &str,
        metric: Option<&str>,
        severity: Severity,
        message: String,
        value: f64,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            rule_id: rule_id.to_string(),
            asset_id: asset_id.to_string(),
            metric: metric.map(str::to_string),
            severity,
            message,
            triggering_value: value,
            first_triggered: at,
            last_seen: at,
            status: AlertStatus::Active,
            resolved_at: None,
            acknowledged_at: None,
            acknowledged_by: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == AlertStatus::Active
    }

    pub fn is_acknowledged(&self) -> bool {
        self.acknowledged_at.is_some()
    }
}

impl std::str::FromStr for AlertStatus {
    type Err = AasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(AlertStatus::Active),
            "resolved" => Ok(AlertStatus::Resolved),
            other => Err(AasError::validation(format!("unknown alert status: {other}"))),
        }
    }
}

/// Query over stored alerts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertQuery {
    #[serde(default)]
    pub asset_id: Option<String>,

    #[serde(default)]
    pub rule_id: Option<String>,

    #[serde(default)]
    pub status: Option<AlertStatus>,

    /// Only alerts first triggered at or after this time
    #[serde(default)]
    pub since: Option<DateTime<Utc>>,

    #[serde(default)]
    pub limit: Option<usize>,
}

impl AlertQuery {
    pub fn active_for(asset_id: impl Into<String>) -> Self {
        Self {
            asset_id: Some(asset_id.into()),
            status: Some(AlertStatus::Active),
            ..Self::default()
        }
    }

    pub fn matches(&self, alert: &Alert) -> bool {
        self.asset_id.as_ref().is_none_or(|id| *id == alert.asset_id)
            && self.rule_id.as_ref().is_none_or(|id| *id == alert.rule_id)
            && self.status.is_none_or(|s| s == alert.status)
            && self.since.is_none_or(|since| alert.first_triggered >= since)
    }
}
