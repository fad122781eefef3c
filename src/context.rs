//! Handles shared by the repository, ingestion, alerting and query services

use std::future::Future;
use std::sync::Arc;

use crate::error::{AasError, AasResult};
use crate::events::EventBus;
use crate::locks::AssetLocks;
use crate::model::Asset;
use crate::storage::{RetryPolicy, StorageBackend, StorageResult, with_retry};

#[derive(Clone)]
pub struct Context {
    pub backend: Arc<dyn StorageBackend>,
    pub locks: AssetLocks,
    pub retry: RetryPolicy,
    pub events: EventBus,
}

impl Context {
    pub fn new(backend: Arc<dyn StorageBackend>, retry: RetryPolicy, events: EventBus) -> Self {
        Self {
            backend,
            locks: AssetLocks::new(),
            retry,
            events,
        }
    }

    /// Run a storage operation under the retry policy
    pub async fn storage<T, F, Fut>(&self, operation: &str, op: F) -> AasResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = StorageResult<T>>,
    {
        Ok(with_retry(&self.retry, operation, op).await?)
    }

    pub async fn load_asset(&self, id: &str) -> AasResult<Asset> {
        self.storage("load_asset", || self.backend.load_asset(id))
            .await?
            .ok_or_else(|| AasError::not_found(format!("asset {id}")))
    }
}

/// Reject a mutation based on a stale revision
pub fn check_revision(asset: &Asset, expected: Option<u64>) -> AasResult<()> {
    match expected {
        Some(expected) if expected != asset.last_modified => Err(AasError::conflict(format!(
            "asset {} is at revision {}, expected {expected}",
            asset.id, asset.last_modified
        ))),
        _ => Ok(()),
    }
}
