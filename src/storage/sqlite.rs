//! SQLite storage backend implementation
//!
//! This module provides a SQLite-based implementation of the `StorageBackend` trait.
//!
//! ## Features
//!
//! - **Embedded**: No separate database server required
//! - **WAL mode**: Readers see a consistent snapshot while a write is in flight
//! - **Connection pooling**: Efficient resource usage
//! - **Migrations**: Automatic schema versioning with sqlx
//!
//! ## Layout
//!
//! The asset aggregate is split over `assets`, `submodels`, `properties` and
//! `current_values`, all cascading from `assets`. `metric_readings` has no
//! foreign key so history outlives deleted assets until retention runs.
//! Property values and maintenance schedules are stored as JSON; timestamps
//! are Unix nanoseconds.
//!
//! ## Limitations
//!
//! - **Concurrency**: One writer at a time; lock contention surfaces as
//!   `StorageError::Busy` once the busy timeout expires
//! - **Distributed**: Single-machine only

use std::collections::HashMap;
use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePoolOptions, SqliteRow,
    SqliteSynchronous,
};
use sqlx::{Pool, QueryBuilder, Row, Sqlite};
use tracing::{debug, info, instrument, warn};

use crate::alerting::{Alert, AlertQuery};
use crate::model::{Asset, AssetFilter, CurrentValue, MetricReading, Property, Submodel};

use super::backend::{HealthStatus, StorageBackend};
use super::error::{StorageError, StorageResult};
use super::schema::{IngestionCommit, ReadingQuery, RetentionOutcome, RetentionPolicy};

const ASSET_COLUMNS: &str = "id, name, kind, description, global_asset_id, status, \
                             created_at, updated_at, last_modified, maintenance";

const ALERT_COLUMNS: &str = "id, rule_id, asset_id, metric, severity, message, triggering_value, \
                             first_triggered, last_seen, status, resolved_at, acknowledged_at, \
                             acknowledged_by";

/// SQLite storage backend
///
/// This backend stores the repository in a local SQLite database file.
/// It's ideal for a single hub with a few hundred assets.
pub struct SqliteBackend {
    pool: Pool<Sqlite>,
    db_path: String,
}

impl SqliteBackend {
    /// Create a new SQLite backend
    ///
    /// This will:
    /// 1. Create the database file if it doesn't exist
    /// 2. Run migrations to create tables
    /// 3. Configure SQLite for WAL mode and foreign key enforcement
    ///
    /// ## Example
    ///
    /// ```no_run
    /// # use aas_monitor::storage::sqlite::SqliteBackend;
    /// # async fn example() -> anyhow::Result<()> {
    /// let backend = SqliteBackend::new("./aas.db").await?;
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip_all)]
    pub async fn new(db_path: impl AsRef<Path>) -> StorageResult<Self> {
        let db_path_str = db_path.as_ref().to_string_lossy().to_string();

        info!("initializing SQLite backend at: {}", db_path_str);

        let options = SqliteConnectOptions::new()
            .filename(&db_path_str)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        info!("SQLite connection pool created");

        debug!("running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;

        info!("database migrations complete");

        Ok(Self {
            pool,
            db_path: db_path_str,
        })
    }
}

fn timestamp_to_nanos(dt: &DateTime<Utc>) -> StorageResult<i64> {
    dt.timestamp_nanos_opt().ok_or_else(|| {
        StorageError::SerializationError(format!("timestamp {dt} outside the storable range"))
    })
}

// Range bounds past the storable span clamp to its ends
fn bound_to_nanos(dt: &DateTime<Utc>) -> i64 {
    dt.timestamp_nanos_opt()
        .unwrap_or(if dt.timestamp() < 0 { i64::MIN } else { i64::MAX })
}

fn nanos_to_timestamp(nanos: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_nanos(nanos)
}

fn parse_column<T>(column: &str, raw: &str) -> StorageResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse().map_err(|e| {
        StorageError::SerializationError(format!("invalid {column} value {raw:?}: {e}"))
    })
}

fn asset_from_row(row: &SqliteRow) -> StorageResult<Asset> {
    let status: String = row.try_get("status")?;
    let maintenance: Option<String> = row.try_get("maintenance")?;

    Ok(Asset {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        kind: row.try_get("kind")?,
        description: row.try_get("description")?,
        global_asset_id: row.try_get("global_asset_id")?,
        status: parse_column("status", &status)?,
        created_at: nanos_to_timestamp(row.try_get("created_at")?),
        updated_at: nanos_to_timestamp(row.try_get("updated_at")?),
        last_modified: row.try_get::<i64, _>("last_modified")? as u64,
        maintenance: maintenance
            .as_deref()
            .map(serde_json::from_str::<crate::model::MaintenanceSchedule>)
            .transpose()?,
        current: Default::default(),
        submodels: Vec::new(),
    })
}

fn alert_from_row(row: &SqliteRow) -> StorageResult<Alert> {
    let severity: String = row.try_get("severity")?;
    let status: String = row.try_get("status")?;

    Ok(Alert {
        id: row.try_get("id")?,
        rule_id: row.try_get("rule_id")?,
        asset_id: row.try_get("asset_id")?,
        metric: row.try_get("metric")?,
        severity: parse_column("severity", &severity)?,
        message: row.try_get("message")?,
        triggering_value: row.try_get("triggering_value")?,
        first_triggered: nanos_to_timestamp(row.try_get("first_triggered")?),
        last_seen: nanos_to_timestamp(row.try_get("last_seen")?),
        status: parse_column("status", &status)?,
        resolved_at: row
            .try_get::<Option<i64>, _>("resolved_at")?
            .map(nanos_to_timestamp),
        acknowledged_at: row
            .try_get::<Option<i64>, _>("acknowledged_at")?
            .map(nanos_to_timestamp),
        acknowledged_by: row.try_get("acknowledged_by")?,
    })
}

fn reading_from_row(row: &SqliteRow) -> StorageResult<MetricReading> {
    Ok(MetricReading {
        asset_id: row.try_get("asset_id")?,
        metric: row.try_get("metric")?,
        value: row.try_get("value")?,
        timestamp: nanos_to_timestamp(row.try_get("timestamp")?),
        source: row.try_get("source")?,
    })
}

/// Fill in submodels, properties and the value cache of a freshly loaded row
async fn load_children(conn: &mut SqliteConnection, asset: &mut Asset) -> StorageResult<()> {
    let submodel_rows = sqlx::query(
        "SELECT id, kind, description FROM submodels WHERE asset_id = ? ORDER BY position",
    )
    .bind(&asset.id)
    .fetch_all(&mut *conn)
    .await?;

    let mut submodels = submodel_rows
        .iter()
        .map(|row| -> StorageResult<Submodel> {
            Ok(Submodel {
                id: row.try_get("id")?,
                kind: row.try_get("kind")?,
                description: row.try_get("description")?,
                properties: Vec::new(),
            })
        })
        .collect::<StorageResult<Vec<_>>>()?;

    let property_rows = sqlx::query(
        r#"
        SELECT submodel_id, key, value, unit, description, updated_at
        FROM properties
        WHERE asset_id = ?
        ORDER BY submodel_id, position
        "#,
    )
    .bind(&asset.id)
    .fetch_all(&mut *conn)
    .await?;

    for row in &property_rows {
        let submodel_id: String = row.try_get("submodel_id")?;
        let value: String = row.try_get("value")?;
        let property = Property {
            key: row.try_get("key")?,
            value: serde_json::from_str(&value)?,
            unit: row.try_get("unit")?,
            description: row.try_get("description")?,
            updated_at: nanos_to_timestamp(row.try_get("updated_at")?),
        };
        if let Some(submodel) = submodels.iter_mut().find(|s| s.id == submodel_id) {
            submodel.properties.push(property);
        }
    }

    let current_rows =
        sqlx::query("SELECT metric, value, timestamp FROM current_values WHERE asset_id = ?")
            .bind(&asset.id)
            .fetch_all(&mut *conn)
            .await?;

    for row in &current_rows {
        asset.current.insert(
            row.try_get("metric")?,
            CurrentValue {
                value: row.try_get("value")?,
                timestamp: nanos_to_timestamp(row.try_get("timestamp")?),
            },
        );
    }

    asset.submodels = submodels;
    Ok(())
}

/// Write submodels, properties and the value cache of an asset whose child rows are absent
async fn write_children(conn: &mut SqliteConnection, asset: &Asset) -> StorageResult<()> {
    for (position, submodel) in asset.submodels.iter().enumerate() {
        sqlx::query(
            "INSERT INTO submodels (asset_id, id, position, kind, description) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&asset.id)
        .bind(&submodel.id)
        .bind(position as i64)
        .bind(&submodel.kind)
        .bind(&submodel.description)
        .execute(&mut *conn)
        .await?;

        for (position, property) in submodel.properties.iter().enumerate() {
            let value = serde_json::to_string(&property.value)?;
            sqlx::query(
                r#"
                INSERT INTO properties (
                    asset_id, submodel_id, key, position, value, unit, description, updated_at
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&asset.id)
            .bind(&submodel.id)
            .bind(&property.key)
            .bind(position as i64)
            .bind(value)
            .bind(&property.unit)
            .bind(&property.description)
            .bind(timestamp_to_nanos(&property.updated_at)?)
            .execute(&mut *conn)
            .await?;
        }
    }

    for (metric, current) in &asset.current {
        upsert_current(conn, &asset.id, metric, current).await?;
    }
    Ok(())
}

async fn upsert_current(
    conn: &mut SqliteConnection,
    asset_id: &str,
    metric: &str,
    current: &CurrentValue,
) -> StorageResult<()> {
    sqlx::query(
        r#"
        INSERT INTO current_values (asset_id, metric, value, timestamp)
        VALUES (?, ?, ?, ?)
        ON CONFLICT (asset_id, metric) DO UPDATE SET
            value = excluded.value,
            timestamp = excluded.timestamp
        "#,
    )
    .bind(asset_id)
    .bind(metric)
    .bind(current.value)
    .bind(timestamp_to_nanos(&current.timestamp)?)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Upsert alerts, resolutions first so a re-raise never trips the active index
async fn write_alerts(conn: &mut SqliteConnection, alerts: &[Alert]) -> StorageResult<()> {
    let ordered = alerts
        .iter()
        .filter(|a| !a.is_active())
        .chain(alerts.iter().filter(|a| a.is_active()));

    for alert in ordered {
        sqlx::query(
            r#"
            INSERT INTO alerts (
                id, rule_id, asset_id, metric, severity, message, triggering_value,
                first_triggered, last_seen, status, resolved_at, acknowledged_at, acknowledged_by
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                first_triggered = excluded.first_triggered,
                message = excluded.message,
                triggering_value = excluded.triggering_value,
                last_seen = excluded.last_seen,
                status = excluded.status,
                resolved_at = excluded.resolved_at,
                acknowledged_at = excluded.acknowledged_at,
                acknowledged_by = excluded.acknowledged_by
            "#,
        )
        .bind(&alert.id)
        .bind(&alert.rule_id)
        .bind(&alert.asset_id)
        .bind(&alert.metric)
        .bind(alert.severity.as_str())
        .bind(&alert.message)
        .bind(alert.triggering_value)
        .bind(timestamp_to_nanos(&alert.first_triggered)?)
        .bind(timestamp_to_nanos(&alert.last_seen)?)
        .bind(alert.status.as_str())
        .bind(alert.resolved_at.as_ref().map(timestamp_to_nanos).transpose()?)
        .bind(alert.acknowledged_at.as_ref().map(timestamp_to_nanos).transpose()?)
        .bind(&alert.acknowledged_by)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

#[async_trait]
impl StorageBackend for SqliteBackend {
    #[instrument(skip(self, asset), fields(asset_id = %asset.id))]
    async fn insert_asset(&self, asset: &Asset) -> StorageResult<()> {
        let maintenance = asset
            .maintenance
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO assets (
                id, name, kind, description, global_asset_id, status,
                created_at, updated_at, last_modified, maintenance
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&asset.id)
        .bind(&asset.name)
        .bind(&asset.kind)
        .bind(&asset.description)
        .bind(&asset.global_asset_id)
        .bind(asset.status.as_str())
        .bind(timestamp_to_nanos(&asset.created_at)?)
        .bind(timestamp_to_nanos(&asset.updated_at)?)
        .bind(asset.last_modified as i64)
        .bind(maintenance)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::Constraint(format!(
                "asset {} already exists",
                asset.id
            )));
        }

        write_children(&mut *tx, asset).await?;
        tx.commit().await?;

        debug!("inserted asset {}", asset.id);
        Ok(())
    }

    #[instrument(skip(self, asset, alerts), fields(asset_id = %asset.id, alerts = alerts.len()))]
    async fn save_asset(&self, asset: &Asset, alerts: &[Alert]) -> StorageResult<()> {
        let maintenance = asset
            .maintenance
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE assets SET
                name = ?, kind = ?, description = ?, global_asset_id = ?, status = ?,
                updated_at = ?, last_modified = ?, maintenance = ?
            WHERE id = ?
            "#,
        )
        .bind(&asset.name)
        .bind(&asset.kind)
        .bind(&asset.description)
        .bind(&asset.global_asset_id)
        .bind(asset.status.as_str())
        .bind(timestamp_to_nanos(&asset.updated_at)?)
        .bind(asset.last_modified as i64)
        .bind(maintenance)
        .bind(&asset.id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::QueryFailed(format!(
                "asset {} does not exist",
                asset.id
            )));
        }

        // properties cascade from submodels
        sqlx::query("DELETE FROM submodels WHERE asset_id = ?")
            .bind(&asset.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM current_values WHERE asset_id = ?")
            .bind(&asset.id)
            .execute(&mut *tx)
            .await?;

        write_children(&mut *tx, asset).await?;
        write_alerts(&mut *tx, alerts).await?;
        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn load_asset(&self, id: &str) -> StorageResult<Option<Asset>> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!("SELECT {ASSET_COLUMNS} FROM assets WHERE id = ?"))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        let asset = match row {
            Some(row) => {
                let mut asset = asset_from_row(&row)?;
                load_children(&mut *tx, &mut asset).await?;
                Some(asset)
            }
            None => None,
        };

        tx.commit().await?;
        Ok(asset)
    }

    #[instrument(skip(self))]
    async fn list_assets(&self, filter: &AssetFilter) -> StorageResult<Vec<Asset>> {
        let mut tx = self.pool.begin().await?;

        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {ASSET_COLUMNS} FROM assets WHERE 1 = 1"));
        if let Some(kind) = &filter.kind {
            builder.push(" AND kind = ").push_bind(kind.clone());
        }
        if let Some(status) = filter.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        builder.push(" ORDER BY created_at ASC, id ASC");

        let rows = builder.build().fetch_all(&mut *tx).await?;

        let mut assets = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut asset = asset_from_row(row)?;
            load_children(&mut *tx, &mut asset).await?;
            assets.push(asset);
        }

        tx.commit().await?;
        debug!("listed {} assets", assets.len());
        Ok(assets)
    }

    #[instrument(skip(self))]
    async fn delete_asset(&self, id: &str) -> StorageResult<bool> {
        // submodels, properties, current values and alerts cascade
        let result = sqlx::query("DELETE FROM assets WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(
        skip(self, commit),
        fields(asset_id = %commit.reading.asset_id, metric = %commit.reading.metric)
    )]
    async fn commit_ingestion(&self, commit: &IngestionCommit) -> StorageResult<()> {
        let reading = &commit.reading;
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE assets SET last_modified = ?, updated_at = ? WHERE id = ?",
        )
        .bind(commit.last_modified as i64)
        .bind(timestamp_to_nanos(&commit.updated_at)?)
        .bind(&reading.asset_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::QueryFailed(format!(
                "asset {} does not exist",
                reading.asset_id
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO metric_readings (asset_id, metric, value, timestamp, source)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&reading.asset_id)
        .bind(&reading.metric)
        .bind(reading.value)
        .bind(timestamp_to_nanos(&reading.timestamp)?)
        .bind(&reading.source)
        .execute(&mut *tx)
        .await?;

        if let Some(current) = &commit.current {
            upsert_current(&mut *tx, &reading.asset_id, &reading.metric, current).await?;
        }

        for id in &commit.removed_alerts {
            sqlx::query("DELETE FROM alerts WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        write_alerts(&mut *tx, &commit.alerts).await?;
        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self, alerts), fields(count = alerts.len()))]
    async fn upsert_alerts(&self, alerts: &[Alert]) -> StorageResult<()> {
        if alerts.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        write_alerts(&mut *tx, alerts).await?;
        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn load_alert(&self, id: &str) -> StorageResult<Option<Alert>> {
        let row = sqlx::query(&format!("SELECT {ALERT_COLUMNS} FROM alerts WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(alert_from_row).transpose()
    }

    #[instrument(skip(self))]
    async fn query_alerts(&self, query: &AlertQuery) -> StorageResult<Vec<Alert>> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {ALERT_COLUMNS} FROM alerts WHERE 1 = 1"));
        if let Some(asset_id) = &query.asset_id {
            builder.push(" AND asset_id = ").push_bind(asset_id.clone());
        }
        if let Some(rule_id) = &query.rule_id {
            builder.push(" AND rule_id = ").push_bind(rule_id.clone());
        }
        if let Some(status) = query.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(since) = &query.since {
            builder
                .push(" AND first_triggered >= ")
                .push_bind(bound_to_nanos(since));
        }
        builder.push(" ORDER BY first_triggered DESC, id DESC");
        if let Some(limit) = query.limit {
            builder.push(" LIMIT ").push_bind(limit as i64);
        }

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(alert_from_row).collect()
    }

    #[instrument(skip(self), fields(asset_id = %query.asset_id))]
    async fn query_readings(&self, query: &ReadingQuery) -> StorageResult<Vec<MetricReading>> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT asset_id, metric, value, timestamp, source FROM metric_readings WHERE asset_id = ",
        );
        builder.push_bind(query.asset_id.clone());
        if let Some(metric) = &query.metric {
            builder.push(" AND metric = ").push_bind(metric.clone());
        }
        if let Some(start) = &query.start {
            builder
                .push(" AND timestamp >= ")
                .push_bind(bound_to_nanos(start));
        }
        if let Some(end) = &query.end {
            builder
                .push(" AND timestamp <= ")
                .push_bind(bound_to_nanos(end));
        }
        builder.push(" ORDER BY timestamp DESC, id DESC");
        if let Some(limit) = query.limit {
            builder.push(" LIMIT ").push_bind(limit as i64);
        }

        let rows = builder.build().fetch_all(&self.pool).await?;
        let mut readings = rows
            .iter()
            .map(reading_from_row)
            .collect::<StorageResult<Vec<_>>>()?;

        // Reverse to get chronological order (oldest first)
        readings.reverse();
        debug!("query returned {} readings", readings.len());
        Ok(readings)
    }

    #[instrument(skip(self, policy))]
    async fn apply_retention(
        &self,
        policy: &RetentionPolicy,
        now: DateTime<Utc>,
    ) -> StorageResult<RetentionOutcome> {
        let mut outcome = RetentionOutcome::default();
        let mut tx = self.pool.begin().await?;

        if let Some(cutoff) = policy.reading_cutoff(now) {
            let result = sqlx::query("DELETE FROM metric_readings WHERE timestamp < ?")
                .bind(bound_to_nanos(&cutoff))
                .execute(&mut *tx)
                .await?;
            outcome.readings_deleted += result.rows_affected();
        }

        if let Some(max) = policy.max_readings_per_metric {
            let result = sqlx::query(
                r#"
                DELETE FROM metric_readings WHERE id IN (
                    SELECT id FROM (
                        SELECT id, ROW_NUMBER() OVER (
                            PARTITION BY asset_id, metric
                            ORDER BY timestamp DESC, id DESC
                        ) AS rn
                        FROM metric_readings
                    )
                    WHERE rn > ?
                )
                "#,
            )
            .bind(max as i64)
            .execute(&mut *tx)
            .await?;
            outcome.readings_deleted += result.rows_affected();
        }

        if let Some(cutoff) = policy.alert_cutoff(now) {
            let result =
                sqlx::query("DELETE FROM alerts WHERE status = 'resolved' AND resolved_at < ?")
                    .bind(bound_to_nanos(&cutoff))
                    .execute(&mut *tx)
                    .await?;
            outcome.alerts_deleted = result.rows_affected();
        }

        tx.commit().await?;

        info!(
            "retention removed {} readings and {} resolved alerts",
            outcome.readings_deleted, outcome.alerts_deleted
        );
        Ok(outcome)
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        // Simple ping query to verify connection
        match sqlx::query("SELECT 1").fetch_one(&self.pool).await {
            Ok(_) => {
                let mut metadata = HashMap::new();
                metadata.insert("backend".to_string(), "sqlite".to_string());
                metadata.insert("db_path".to_string(), self.db_path.clone());

                Ok(HealthStatus {
                    healthy: true,
                    message: "SQLite backend operational".to_string(),
                    metadata,
                })
            }
            Err(e) => {
                warn!("health check failed: {}", e);
                Ok(HealthStatus {
                    healthy: false,
                    message: format!("health check failed: {}", e),
                    metadata: HashMap::new(),
                })
            }
        }
    }

    async fn get_stats(&self) -> StorageResult<String> {
        let (assets,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM assets")
            .fetch_one(&self.pool)
            .await?;
        let (readings,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM metric_readings")
            .fetch_one(&self.pool)
            .await?;
        let (active,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM alerts WHERE status = 'active'")
                .fetch_one(&self.pool)
                .await?;

        let file_size = std::fs::metadata(&self.db_path)
            .map(|m| m.len())
            .unwrap_or(0);
        let file_size_mb = file_size as f64 / 1_000_000.0;

        Ok(format!(
            "SQLite: {} assets, {} readings, {} active alerts, {:.2} MB on disk",
            assets, readings, active, file_size_mb
        ))
    }

    async fn close(&self) -> StorageResult<()> {
        info!("closing SQLite backend");
        self.pool.close().await;
        Ok(())
    }
}
