//! In-memory storage backend (no persistence)
//!
//! It's useful for:
//! - Testing without database dependencies
//! - Running the hub without a storage section in the config
//!
//! All state sits behind one `RwLock`, so every write method is trivially
//! atomic and readers always see a consistent snapshot.
//!
//! ## Limitations
//!
//! - **No persistence**: All data lost on restart

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::alerting::{Alert, AlertQuery, AlertStatus};
use crate::model::{Asset, AssetFilter, MetricReading};

use super::backend::{HealthStatus, StorageBackend};
use super::error::{StorageError, StorageResult};
use super::schema::{IngestionCommit, ReadingQuery, RetentionOutcome, RetentionPolicy};

#[derive(Debug, Default)]
struct MemoryState {
    assets: HashMap<String, Asset>,

    /// Append-only history, in insertion order
    readings: Vec<MetricReading>,

    alerts: HashMap<String, Alert>,
}

impl MemoryState {
    /// Drop `removed`, then apply alert upserts, keeping at most one active
    /// alert per asset and rule
    fn write_alerts(&mut self, alerts: &[Alert], removed: &[String]) -> StorageResult<()> {
        for alert in alerts {
            if alert.is_active() {
                let duplicate = self.alerts.values().any(|other| {
                    other.id != alert.id
                        && other.is_active()
                        && other.asset_id == alert.asset_id
                        && other.rule_id == alert.rule_id
                        && !removed.contains(&other.id)
                        && !alerts.iter().any(|a| a.id == other.id && !a.is_active())
                });
                if duplicate {
                    return Err(StorageError::Constraint(format!(
                        "asset {} already has an active alert for rule {}",
                        alert.asset_id, alert.rule_id
                    )));
                }
            }
        }

        for id in removed {
            self.alerts.remove(id);
        }
        for alert in alerts {
            self.alerts.insert(alert.id.clone(), alert.clone());
        }
        Ok(())
    }
}

/// In-memory storage backend
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: RwLock<MemoryState>,
}

impl MemoryBackend {
    /// Create a new in-memory backend
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn insert_asset(&self, asset: &Asset) -> StorageResult<()> {
        let mut state = self.state.write().await;
        if state.assets.contains_key(&asset.id) {
            return Err(StorageError::Constraint(format!(
                "asset {} already exists",
                asset.id
            )));
        }
        state.assets.insert(asset.id.clone(), asset.clone());
        Ok(())
    }

    async fn save_asset(&self, asset: &Asset, alerts: &[Alert]) -> StorageResult<()> {
        let mut state = self.state.write().await;
        if !state.assets.contains_key(&asset.id) {
            return Err(StorageError::QueryFailed(format!(
                "asset {} does not exist",
                asset.id
            )));
        }
        state.write_alerts(alerts, &[])?;
        state.assets.insert(asset.id.clone(), asset.clone());
        Ok(())
    }

    async fn load_asset(&self, id: &str) -> StorageResult<Option<Asset>> {
        Ok(self.state.read().await.assets.get(id).cloned())
    }

    async fn list_assets(&self, filter: &AssetFilter) -> StorageResult<Vec<Asset>> {
        let state = self.state.read().await;
        let mut assets: Vec<Asset> = state
            .assets
            .values()
            .filter(|asset| filter.matches(asset))
            .cloned()
            .collect();
        assets.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(assets)
    }

    async fn delete_asset(&self, id: &str) -> StorageResult<bool> {
        let mut state = self.state.write().await;
        if state.assets.remove(id).is_none() {
            return Ok(false);
        }
        state.alerts.retain(|_, alert| alert.asset_id != id);
        debug!("in-memory backend: deleted asset {id}");
        Ok(true)
    }

    async fn commit_ingestion(&self, commit: &IngestionCommit) -> StorageResult<()> {
        let mut state = self.state.write().await;
        let asset_id = &commit.reading.asset_id;
        if !state.assets.contains_key(asset_id) {
            return Err(StorageError::QueryFailed(format!(
                "asset {asset_id} does not exist"
            )));
        }

        state.write_alerts(&commit.alerts, &commit.removed_alerts)?;
        state.readings.push(commit.reading.clone());

        if let Some(asset) = state.assets.get_mut(asset_id) {
            if let Some(current) = commit.current {
                asset.current.insert(commit.reading.metric.clone(), current);
            }
            asset.last_modified = commit.last_modified;
            asset.updated_at = commit.updated_at;
        }
        Ok(())
    }

    async fn upsert_alerts(&self, alerts: &[Alert]) -> StorageResult<()> {
        self.state.write().await.write_alerts(alerts, &[])
    }

    async fn load_alert(&self, id: &str) -> StorageResult<Option<Alert>> {
        Ok(self.state.read().await.alerts.get(id).cloned())
    }

    async fn query_alerts(&self, query: &AlertQuery) -> StorageResult<Vec<Alert>> {
        let state = self.state.read().await;
        let mut alerts: Vec<Alert> = state
            .alerts
            .values()
            .filter(|alert| query.matches(alert))
            .cloned()
            .collect();
        alerts.sort_by(|a, b| {
            b.first_triggered
                .cmp(&a.first_triggered)
                .then_with(|| b.id.cmp(&a.id))
        });
        if let Some(limit) = query.limit {
            alerts.truncate(limit);
        }
        Ok(alerts)
    }

    async fn query_readings(&self, query: &ReadingQuery) -> StorageResult<Vec<MetricReading>> {
        let state = self.state.read().await;
        let mut readings: Vec<MetricReading> = state
            .readings
            .iter()
            .filter(|reading| query.matches(reading))
            .cloned()
            .collect();
        // stable sort keeps insertion order for equal timestamps
        readings.sort_by_key(|reading| reading.timestamp);
        if let Some(limit) = query.limit
            && readings.len() > limit
        {
            readings.drain(..readings.len() - limit);
        }
        Ok(readings)
    }

    async fn apply_retention(
        &self,
        policy: &RetentionPolicy,
        now: DateTime<Utc>,
    ) -> StorageResult<RetentionOutcome> {
        let mut state = self.state.write().await;
        let before = state.readings.len();

        if let Some(cutoff) = policy.reading_cutoff(now) {
            state.readings.retain(|reading| reading.timestamp >= cutoff);
        }

        if let Some(max) = policy.max_readings_per_metric {
            let mut series: HashMap<(String, String), Vec<usize>> = HashMap::new();
            for (index, reading) in state.readings.iter().enumerate() {
                series
                    .entry((reading.asset_id.clone(), reading.metric.clone()))
                    .or_default()
                    .push(index);
            }

            let mut doomed = vec![false; state.readings.len()];
            for mut indices in series.into_values() {
                if indices.len() <= max {
                    continue;
                }
                indices.sort_by_key(|&i| state.readings[i].timestamp);
                for &i in &indices[..indices.len() - max] {
                    doomed[i] = true;
                }
            }

            let mut index = 0;
            state.readings.retain(|_| {
                let keep = !doomed[index];
                index += 1;
                keep
            });
        }

        let readings_deleted = (before - state.readings.len()) as u64;

        let alerts_before = state.alerts.len();
        if let Some(cutoff) = policy.alert_cutoff(now) {
            state.alerts.retain(|_, alert| {
                alert.status == AlertStatus::Active
                    || alert.resolved_at.is_none_or(|resolved| resolved >= cutoff)
            });
        }
        let alerts_deleted = (alerts_before - state.alerts.len()) as u64;

        Ok(RetentionOutcome {
            readings_deleted,
            alerts_deleted,
        })
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        let mut metadata = HashMap::new();
        metadata.insert("backend".to_string(), "memory".to_string());

        Ok(HealthStatus {
            healthy: true,
            message: "in-memory backend operational".to_string(),
            metadata,
        })
    }

    async fn get_stats(&self) -> StorageResult<String> {
        let state = self.state.read().await;
        Ok(format!(
            "in-memory: {} assets, {} readings, {} alerts",
            state.assets.len(),
            state.readings.len(),
            state.alerts.len()
        ))
    }

    async fn close(&self) -> StorageResult<()> {
        debug!("closing in-memory backend");
        Ok(())
    }
}
