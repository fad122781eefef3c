//! Metric ingestion
//!
//! `ingest` validates a reading, then inside the asset's critical section
//! updates the current-value cache, re-evaluates the rules bound to the metric
//! and commits reading, cache and alert changes as one unit. A reading older
//! than the cached value leaves the cache alone and replays the metric's
//! threshold rules in timestamp order instead.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::alerting::service::AlertUpdate;
use crate::alerting::{AlertService, AlertTransition};
use crate::context::Context;
use crate::error::{AasError, AasResult};
use crate::events::AasEvent;
use crate::model::{DEFAULT_SERVICE_METRIC, MetricReading, validate_identifier};
use crate::storage::IngestionCommit;

/// Accepted value range of one metric (inclusive)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricBounds {
    #[serde(default)]
    pub min: Option<f64>,

    #[serde(default)]
    pub max: Option<f64>,
}

impl MetricBounds {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min.is_none_or(|min| value >= min) && self.max.is_none_or(|max| value <= max)
    }
}

pub fn default_metric_bounds() -> HashMap<String, MetricBounds> {
    HashMap::from([
        (
            "temperature".to_string(),
            MetricBounds::new(Some(-273.15), Some(1000.0)),
        ),
        (
            "efficiency".to_string(),
            MetricBounds::new(Some(0.0), Some(100.0)),
        ),
        (
            DEFAULT_SERVICE_METRIC.to_string(),
            MetricBounds::new(Some(0.0), None),
        ),
    ])
}

/// Result of one successful ingestion
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub reading: MetricReading,

    /// Whether the reading replaced the cached current value
    pub cache_updated: bool,

    /// Asset revision after the ingestion
    pub last_modified: u64,

    pub transitions: Vec<AlertTransition>,
}

#[derive(Clone)]
pub struct MetricIngestor {
    ctx: Context,
    alerts: AlertService,
    bounds: Arc<HashMap<String, MetricBounds>>,
}

impl MetricIngestor {
    pub fn new(ctx: Context, alerts: AlertService, bounds: HashMap<String, MetricBounds>) -> Self {
        Self {
            ctx,
            alerts,
            bounds: Arc::new(bounds),
        }
    }

    pub fn validate(&self, reading: &MetricReading) -> AasResult<()> {
        validate_identifier("asset id", &reading.asset_id)?;
        validate_identifier("metric name", &reading.metric)?;

        if !reading.value.is_finite() {
            return Err(AasError::validation(format!(
                "{} value must be a finite number",
                reading.metric
            )));
        }

        if reading.timestamp.timestamp_nanos_opt().is_none() {
            return Err(AasError::validation(format!(
                "{} timestamp {} outside the supported range",
                reading.metric, reading.timestamp
            )));
        }

        if let Some(bounds) = self.bounds.get(&reading.metric)
            && !bounds.contains(reading.value)
        {
            return Err(AasError::validation(format!(
                "{} value {} outside of [{}, {}]",
                reading.metric,
                reading.value,
                bounds.min.map_or("-inf".to_string(), |v| v.to_string()),
                bounds.max.map_or("inf".to_string(), |v| v.to_string()),
            )));
        }
        Ok(())
    }

    #[instrument(
        skip(self, reading),
        fields(asset_id = %reading.asset_id, metric = %reading.metric, value = reading.value)
    )]
    pub async fn ingest(&self, reading: MetricReading) -> AasResult<IngestOutcome> {
        self.validate(&reading)?;

        let _guard = self.ctx.locks.lock(&reading.asset_id).await;

        let mut asset = self.ctx.load_asset(&reading.asset_id).await?;
        let now = Utc::now();

        let cache_updated = asset.apply_reading(&reading);
        if cache_updated {
            asset.touch(now);
        } else {
            debug!("reading older than cached value, cache kept");
        }

        // alert problems must not lose the reading
        let evaluated = if cache_updated {
            self.alerts
                .evaluate_ingested(&asset, &reading.metric, now)
                .await
        } else {
            self.alerts.replay_late_reading(&asset, &reading).await
        };
        let AlertUpdate {
            transitions,
            removed,
        } = evaluated.unwrap_or_else(|err| {
            warn!("{}: alert evaluation failed: {err}", asset.id);
            AlertUpdate::default()
        });

        let commit = IngestionCommit {
            current: if cache_updated {
                asset.current_value(&reading.metric)
            } else {
                None
            },
            reading,
            last_modified: asset.last_modified,
            updated_at: asset.updated_at,
            alerts: transitions.iter().map(|t| t.alert.clone()).collect(),
            removed_alerts: removed,
        };

        self.ctx
            .storage("commit_ingestion", || {
                self.ctx.backend.commit_ingestion(&commit)
            })
            .await?;

        self.ctx.events.publish(AasEvent::ReadingIngested {
            reading: commit.reading.clone(),
            cache_updated,
        });
        self.ctx.events.publish_transitions(&transitions);

        Ok(IngestOutcome {
            reading: commit.reading,
            cache_updated,
            last_modified: asset.last_modified,
            transitions,
        })
    }

    /// Ingest readings one after another; each succeeds or fails on its own
    pub async fn ingest_batch(&self, readings: Vec<MetricReading>) -> Vec<AasResult<IngestOutcome>> {
        let mut results = Vec::with_capacity(readings.len());
        for reading in readings {
            results.push(self.ingest(reading).await);
        }
        results
    }
}
