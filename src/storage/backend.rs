//! Storage backend trait definition
//!
//! This module defines the core `StorageBackend` trait that all
//! storage implementations must implement.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::alerting::{Alert, AlertQuery};
use crate::model::{Asset, AssetFilter, MetricReading};

use super::error::StorageResult;
use super::schema::{IngestionCommit, ReadingQuery, RetentionOutcome, RetentionPolicy};

/// Health status of the storage backend
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    /// Is the backend operational?
    pub healthy: bool,

    /// Human-readable status message
    pub message: String,

    /// Additional backend-specific metadata
    pub metadata: HashMap<String, String>,
}

/// Trait for persistent storage backends
///
/// Every write method is atomic: either all of its effects become visible or
/// none do. Callers serialize writes per asset; backends only need to keep
/// concurrent writes to distinct assets consistent.
///
/// ## Error Handling
///
/// Methods return `StorageResult<T>` which wraps `StorageError`.
/// Uniqueness violations surface as `StorageError::Constraint`, lock
/// contention as `StorageError::Busy`.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Insert a new asset aggregate; `Constraint` if the id is taken
    async fn insert_asset(&self, asset: &Asset) -> StorageResult<()>;

    /// Replace a stored asset aggregate and upsert the given alerts
    async fn save_asset(&self, asset: &Asset, alerts: &[Alert]) -> StorageResult<()>;

    async fn load_asset(&self, id: &str) -> StorageResult<Option<Asset>>;

    /// Assets matching `filter`, ordered by creation time, ties by id
    async fn list_assets(&self, filter: &AssetFilter) -> StorageResult<Vec<Asset>>;

    /// Delete an asset with its submodels, cache and alerts
    ///
    /// Returns `false` if the asset did not exist. Reading history is kept.
    async fn delete_asset(&self, id: &str) -> StorageResult<bool>;

    /// Append a reading, update the cache and asset revision, replace alerts
    async fn commit_ingestion(&self, commit: &IngestionCommit) -> StorageResult<()>;

    /// Insert or update alerts by id
    async fn upsert_alerts(&self, alerts: &[Alert]) -> StorageResult<()>;

    async fn load_alert(&self, id: &str) -> StorageResult<Option<Alert>>;

    /// Alerts matching `query`, newest first
    async fn query_alerts(&self, query: &AlertQuery) -> StorageResult<Vec<Alert>>;

    /// Readings matching `query`, oldest first
    async fn query_readings(&self, query: &ReadingQuery) -> StorageResult<Vec<MetricReading>>;

    /// Delete history according to the retention policy
    async fn apply_retention(
        &self,
        policy: &RetentionPolicy,
        now: DateTime<Utc>,
    ) -> StorageResult<RetentionOutcome>;

    /// Check backend health
    ///
    /// Performs a lightweight operation to verify the backend
    /// is operational (e.g., ping database, check file access).
    async fn health_check(&self) -> StorageResult<HealthStatus>;

    /// Get backend-specific statistics
    ///
    /// Returns human-readable stats about the backend
    /// (e.g., "SQLite: 12 assets, 1.2M readings, 450MB on disk").
    async fn get_stats(&self) -> StorageResult<String>;

    /// Close the backend gracefully
    async fn close(&self) -> StorageResult<()>;
}
