//! Applies engine transitions to stored alerts
//!
//! Acknowledgement, service records and the periodic sweep all run inside the
//! affected asset's critical section. The sweep snapshots the asset ids first
//! and then locks each asset only for its own evaluation.
//!
//! A reading older than the cached value re-runs the threshold rules on its
//! metric over the stored history, from the last alert open at the reading's
//! time. Alerts end up as if every reading had arrived in timestamp order.

use std::slice;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::context::{Context, check_revision};
use crate::error::{AasError, AasResult};
use crate::events::AasEvent;
use crate::model::{Asset, AssetFilter, MetricReading};
use crate::storage::ReadingQuery;

use super::alert::{Alert, AlertQuery, AlertStatus};
use super::engine::{AlertEngine, AlertTransition, TransitionKind};

/// Outcome of one sweep over all assets
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub assets_evaluated: usize,
    pub raised: usize,
    pub refreshed: usize,
    pub resolved: usize,
    pub failed: usize,
}

impl SweepReport {
    fn record(&mut self, transitions: &[AlertTransition]) {
        for transition in transitions {
            match transition.kind {
                TransitionKind::Raised => self.raised += 1,
                TransitionKind::Refreshed => self.refreshed += 1,
                TransitionKind::Resolved => self.resolved += 1,
            }
        }
    }
}

/// Alert writes that belong to one ingestion
#[derive(Debug, Clone, Default)]
pub(crate) struct AlertUpdate {
    pub transitions: Vec<AlertTransition>,

    /// Stored alerts a replay made obsolete
    pub removed: Vec<String>,
}

#[derive(Clone)]
pub struct AlertService {
    ctx: Context,
    engine: AlertEngine,
}

impl AlertService {
    pub fn new(ctx: Context, engine: AlertEngine) -> Self {
        Self { ctx, engine }
    }

    pub fn engine(&self) -> &AlertEngine {
        &self.engine
    }

    /// Active alerts of one asset, as the engine expects them
    pub(crate) async fn active_alerts(&self, asset_id: &str) -> AasResult<Vec<Alert>> {
        let query = AlertQuery::active_for(asset_id);
        self.ctx
            .storage("query_alerts", || self.ctx.backend.query_alerts(&query))
            .await
    }

    /// Evaluate the rules bound to a metric whose cached value just changed
    pub(crate) async fn evaluate_ingested(
        &self,
        asset: &Asset,
        metric: &str,
        now: DateTime<Utc>,
    ) -> AasResult<AlertUpdate> {
        let active = self.active_alerts(&asset.id).await?;
        let transitions = self
            .engine
            .evaluate_metric(asset, metric, &active, now)
            .map_err(|err| AasError::conflict(err.to_string()))?;
        Ok(AlertUpdate {
            transitions,
            removed: Vec::new(),
        })
    }

    /// Re-run the threshold rules of `reading.metric` after a late reading
    pub(crate) async fn replay_late_reading(
        &self,
        asset: &Asset,
        reading: &MetricReading,
    ) -> AasResult<AlertUpdate> {
        let mut update = AlertUpdate::default();
        let at = reading.timestamp;

        for rule in self.engine.threshold_rules_for(asset, &reading.metric) {
            let query = AlertQuery {
                asset_id: Some(asset.id.clone()),
                rule_id: Some(rule.id.clone()),
                ..AlertQuery::default()
            };
            let mut stored = self
                .ctx
                .storage("query_alerts", || self.ctx.backend.query_alerts(&query))
                .await?;
            stored.reverse();

            // the alert active just before `at`, if any, is where the run starts
            let split = stored.partition_point(|alert| alert.first_triggered <= at);
            let open = split
                .checked_sub(1)
                .map(|i| &stored[i])
                .filter(|alert| alert.resolved_at.is_none_or(|resolved| resolved >= at));
            let (anchor, replaced) = match open {
                Some(alert) => (alert.first_triggered, &stored[split - 1..]),
                None => (at, &stored[split..]),
            };
            let open = open.map(|alert| Alert {
                status: AlertStatus::Active,
                resolved_at: None,
                last_seen: alert.first_triggered,
                ..alert.clone()
            });

            let history = ReadingQuery {
                start: Some(anchor),
                ..ReadingQuery::for_asset(&asset.id).metric(&reading.metric)
            };
            let mut readings: Vec<MetricReading> = self
                .ctx
                .storage("query_readings", || self.ctx.backend.query_readings(&history))
                .await?
                .into_iter()
                .filter(|r| open.is_none() || r.timestamp > anchor)
                .collect();
            let position = readings.partition_point(|r| r.timestamp <= at);
            readings.insert(position, reading.clone());

            let replayed = self
                .engine
                .replay_rule(rule, asset, open, &readings)
                .map_err(|err| AasError::conflict(err.to_string()))?;
            debug!(
                "{}: late {} reading replayed rule {} over {} readings",
                asset.id,
                reading.metric,
                rule.id,
                readings.len()
            );

            let kept = replayed.len();
            for (index, mut alert) in replayed.into_iter().enumerate() {
                let previous = replaced.get(index);
                if let Some(previous) = previous {
                    alert.id = previous.id.clone();
                    alert.acknowledged_at = previous.acknowledged_at;
                    alert.acknowledged_by = previous.acknowledged_by.clone();
                }
                if previous == Some(&alert) {
                    continue;
                }

                let kind = match (previous.map(Alert::is_active), alert.is_active()) {
                    (Some(true), true) | (Some(false), false) => TransitionKind::Refreshed,
                    (_, true) => TransitionKind::Raised,
                    (_, false) => TransitionKind::Resolved,
                };
                update.transitions.push(AlertTransition { kind, alert });
            }
            update
                .removed
                .extend(replaced.iter().skip(kept).map(|alert| alert.id.clone()));
        }

        if !update.removed.is_empty() {
            info!(
                "{}: replay superseded {} stored alerts",
                asset.id,
                update.removed.len()
            );
        }
        Ok(update)
    }

    /// Mark an active alert as seen by an operator; it stays active
    #[instrument(skip(self))]
    pub async fn acknowledge(&self, alert_id: &str, by: Option<&str>) -> AasResult<Alert> {
        let asset_id = self.load_alert(alert_id).await?.asset_id;
        let _guard = self.ctx.locks.lock(&asset_id).await;

        // re-read under the lock, the alert may have been resolved meanwhile
        let mut alert = self.load_alert(alert_id).await?;
        if !alert.is_active() {
            return Err(AasError::conflict(format!(
                "alert {alert_id} is already resolved"
            )));
        }
        if alert.is_acknowledged() {
            return Ok(alert);
        }

        alert.acknowledged_at = Some(Utc::now());
        alert.acknowledged_by = by.map(str::to_string);

        self.ctx
            .storage("upsert_alerts", || {
                self.ctx.backend.upsert_alerts(slice::from_ref(&alert))
            })
            .await?;

        info!("alert {} on {} acknowledged", alert.id, alert.asset_id);
        self.ctx.events.publish(AasEvent::AlertAcknowledged {
            alert: alert.clone(),
        });
        Ok(alert)
    }

    async fn load_alert(&self, alert_id: &str) -> AasResult<Alert> {
        self.ctx
            .storage("load_alert", || self.ctx.backend.load_alert(alert_id))
            .await?
            .ok_or_else(|| AasError::not_found(format!("alert {alert_id}")))
    }

    /// Restart the maintenance interval of an asset
    ///
    /// Maintenance rules are re-evaluated right away; if that fails the
    /// service record is still committed and the next sweep catches up.
    #[instrument(skip(self))]
    pub async fn record_service(
        &self,
        asset_id: &str,
        serviced_at: Option<DateTime<Utc>>,
        expected: Option<u64>,
    ) -> AasResult<Asset> {
        let _guard = self.ctx.locks.lock(asset_id).await;

        let mut asset = self.ctx.load_asset(asset_id).await?;
        check_revision(&asset, expected)?;

        let now = Utc::now();
        let Some(schedule) = asset.maintenance.as_mut() else {
            return Err(AasError::validation(format!(
                "asset {asset_id} has no maintenance schedule"
            )));
        };
        schedule.last_serviced = Some(serviced_at.unwrap_or(now));
        asset.touch(now);

        let transitions = match self.active_alerts(asset_id).await {
            Ok(active) => self
                .engine
                .evaluate_maintenance(&asset, &active, now)
                .unwrap_or_else(|err| {
                    warn!("{asset_id}: maintenance evaluation failed: {err}");
                    Vec::new()
                }),
            Err(err) => {
                warn!("{asset_id}: could not load active alerts: {err}");
                Vec::new()
            }
        };
        let alerts: Vec<Alert> = transitions.iter().map(|t| t.alert.clone()).collect();

        self.ctx
            .storage("save_asset", || self.ctx.backend.save_asset(&asset, &alerts))
            .await?;

        info!("{asset_id}: service recorded");
        self.ctx.events.publish(AasEvent::AssetUpdated {
            asset_id: asset.id.clone(),
            last_modified: asset.last_modified,
        });
        self.ctx.events.publish_transitions(&transitions);
        Ok(asset)
    }

    /// Re-evaluate every rule for every asset
    #[instrument(skip(self))]
    pub async fn sweep(&self) -> AasResult<SweepReport> {
        let all = AssetFilter::default();
        let ids: Vec<String> = self
            .ctx
            .storage("list_assets", || self.ctx.backend.list_assets(&all))
            .await?
            .into_iter()
            .map(|asset| asset.id)
            .collect();

        let mut report = SweepReport::default();
        for id in &ids {
            match self.sweep_asset(id, Utc::now()).await {
                Ok(Some(transitions)) => {
                    report.assets_evaluated += 1;
                    report.record(&transitions);
                }
                // deleted since the snapshot
                Ok(None) => {}
                Err(err) => {
                    warn!("sweep of {id} failed: {err}");
                    report.failed += 1;
                }
            }
        }

        debug!("sweep finished: {report:?}");
        Ok(report)
    }

    /// Evaluate one asset; `None` if it no longer exists
    pub async fn sweep_asset(
        &self,
        asset_id: &str,
        now: DateTime<Utc>,
    ) -> AasResult<Option<Vec<AlertTransition>>> {
        let _guard = self.ctx.locks.lock(asset_id).await;

        let asset = match self.ctx.load_asset(asset_id).await {
            Ok(asset) => asset,
            Err(AasError::NotFound(_)) => return Ok(None),
            Err(err) => return Err(err),
        };

        let active = self.active_alerts(asset_id).await?;
        let transitions = self
            .engine
            .evaluate_all(&asset, &active, now)
            .map_err(|err| AasError::conflict(err.to_string()))?;

        if !transitions.is_empty() {
            let alerts: Vec<Alert> = transitions.iter().map(|t| t.alert.clone()).collect();
            self.ctx
                .storage("upsert_alerts", || self.ctx.backend.upsert_alerts(&alerts))
                .await?;
            self.ctx.events.publish_transitions(&transitions);
        }

        Ok(Some(transitions))
    }
}
