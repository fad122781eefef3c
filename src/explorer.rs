//! Read-only query façade for dashboards
//!
//! Nothing here takes an asset lock; every call reads the current storage
//! snapshot and recomputes its result.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::alerting::{Alert, AlertQuery, AlertStatus, Severity};
use crate::context::Context;
use crate::error::AasResult;
use crate::model::{Asset, AssetFilter, AssetSummary, MetricReading};
use crate::storage::ReadingQuery;

/// Property and metric name used for the fleet efficiency figure
const EFFICIENCY: &str = "efficiency";

/// Filter over active alerts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertFilter {
    #[serde(default)]
    pub asset_id: Option<String>,

    #[serde(default)]
    pub rule_id: Option<String>,

    /// Only alerts at or above this severity
    #[serde(default)]
    pub min_severity: Option<Severity>,

    #[serde(default)]
    pub acknowledged: Option<bool>,
}

impl AlertFilter {
    pub fn asset(asset_id: impl Into<String>) -> Self {
        Self {
            asset_id: Some(asset_id.into()),
            ..Self::default()
        }
    }

    pub fn matches(&self, alert: &Alert) -> bool {
        self.min_severity.is_none_or(|min| alert.severity >= min)
            && self
                .acknowledged
                .is_none_or(|ack| ack == alert.is_acknowledged())
    }

    fn to_query(&self, status: Option<AlertStatus>) -> AlertQuery {
        AlertQuery {
            asset_id: self.asset_id.clone(),
            rule_id: self.rule_id.clone(),
            status,
            ..AlertQuery::default()
        }
    }
}

/// Severity descending, then oldest first, then id
pub fn compare_alerts(a: &Alert, b: &Alert) -> Ordering {
    b.severity
        .cmp(&a.severity)
        .then_with(|| a.first_triggered.cmp(&b.first_triggered))
        .then_with(|| a.id.cmp(&b.id))
}

#[derive(Debug, Clone, Serialize)]
pub struct AssetDetail {
    #[serde(flatten)]
    pub asset: Asset,
    pub active_alerts: Vec<Alert>,
}

/// Fleet-wide figures for the dashboard header
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub total_assets: usize,
    pub assets_by_status: BTreeMap<String, usize>,
    pub active_alerts: usize,
    pub unacknowledged_alerts: usize,
    pub alerts_by_severity: BTreeMap<String, usize>,

    /// Mean efficiency over assets reporting one
    pub average_efficiency: Option<f64>,

    pub generated_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct Explorer {
    ctx: Context,
}

impl Explorer {
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    pub async fn list_assets(&self, filter: &AssetFilter) -> AasResult<Vec<AssetSummary>> {
        let assets = self
            .ctx
            .storage("list_assets", || self.ctx.backend.list_assets(filter))
            .await?;
        Ok(assets.iter().map(Asset::summary).collect())
    }

    #[instrument(skip(self))]
    pub async fn get_asset_detail(&self, id: &str) -> AasResult<AssetDetail> {
        let asset = self.ctx.load_asset(id).await?;
        let active_alerts = self
            .list_active_alerts(&AlertFilter {
                asset_id: Some(asset.id.clone()),
                ..AlertFilter::default()
            })
            .await?;

        Ok(AssetDetail {
            asset,
            active_alerts,
        })
    }

    /// Active alerts ordered by severity (desc), then first triggered (asc)
    #[instrument(skip(self))]
    pub async fn list_active_alerts(&self, filter: &AlertFilter) -> AasResult<Vec<Alert>> {
        let query = filter.to_query(Some(AlertStatus::Active));
        let mut alerts: Vec<Alert> = self
            .ctx
            .storage("query_alerts", || self.ctx.backend.query_alerts(&query))
            .await?
            .into_iter()
            .filter(|alert| filter.matches(alert))
            .collect();

        alerts.sort_by(compare_alerts);
        Ok(alerts)
    }

    /// Active and resolved alerts, newest first
    #[instrument(skip(self))]
    pub async fn alert_history(
        &self,
        filter: &AlertFilter,
        since: Option<DateTime<Utc>>,
        limit: Option<usize>,
    ) -> AasResult<Vec<Alert>> {
        let query = AlertQuery {
            since,
            ..filter.to_query(None)
        };
        let mut alerts: Vec<Alert> = self
            .ctx
            .storage("query_alerts", || self.ctx.backend.query_alerts(&query))
            .await?
            .into_iter()
            .filter(|alert| filter.matches(alert))
            .collect();

        if let Some(limit) = limit {
            alerts.truncate(limit);
        }
        Ok(alerts)
    }

    /// Reading history, oldest first; kept for deleted assets until retention
    #[instrument(skip(self))]
    pub async fn metric_history(&self, query: &ReadingQuery) -> AasResult<Vec<MetricReading>> {
        self.ctx
            .storage("query_readings", || self.ctx.backend.query_readings(query))
            .await
    }

    pub async fn overview(&self) -> AasResult<Overview> {
        let all = AssetFilter::default();
        let assets = self
            .ctx
            .storage("list_assets", || self.ctx.backend.list_assets(&all))
            .await?;
        let active = self.list_active_alerts(&AlertFilter::default()).await?;

        let mut assets_by_status = BTreeMap::new();
        for asset in &assets {
            *assets_by_status
                .entry(asset.status.to_string())
                .or_insert(0) += 1;
        }

        let mut alerts_by_severity = BTreeMap::new();
        for alert in &active {
            *alerts_by_severity
                .entry(alert.severity.to_string())
                .or_insert(0) += 1;
        }

        let efficiencies: Vec<f64> = assets.iter().filter_map(efficiency_of).collect();
        let average_efficiency = (!efficiencies.is_empty())
            .then(|| efficiencies.iter().sum::<f64>() / efficiencies.len() as f64);

        Ok(Overview {
            total_assets: assets.len(),
            assets_by_status,
            active_alerts: active.len(),
            unacknowledged_alerts: active.iter().filter(|a| !a.is_acknowledged()).count(),
            alerts_by_severity,
            average_efficiency,
            generated_at: Utc::now(),
        })
    }
}

/// Live efficiency metric, else a static `Efficiency` property
fn efficiency_of(asset: &Asset) -> Option<f64> {
    asset
        .current_value(EFFICIENCY)
        .map(|current| current.value)
        .or_else(|| {
            asset
                .submodels
                .iter()
                .flat_map(|s| &s.properties)
                .find(|p| p.key.eq_ignore_ascii_case(EFFICIENCY))
                .and_then(|p| p.value.as_number())
        })
}
