//! Per-asset critical sections
//!
//! Every mutation of an asset (CRUD, ingestion, acknowledgement, sweep) runs
//! while holding that asset's lock, so the read-evaluate-commit sequence of
//! one asset is serialized while distinct assets proceed in parallel.
//! Entries are created on demand and pruned when the last holder or waiter
//! releases them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Registry = Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>;

#[derive(Debug, Clone, Default)]
pub struct AssetLocks {
    registry: Registry,
}

impl AssetLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `asset_id`
    pub async fn lock(&self, asset_id: &str) -> AssetGuard {
        let entry = {
            let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(registry.entry(asset_id.to_string()).or_default())
        };

        let guard = entry.lock_owned().await;
        AssetGuard {
            asset_id: asset_id.to_string(),
            registry: Arc::clone(&self.registry),
            guard: Some(guard),
        }
    }

    /// Number of assets with a holder or waiter
    pub fn len(&self) -> usize {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Held for the duration of one asset's critical section
pub struct AssetGuard {
    asset_id: String,
    registry: Registry,
    guard: Option<OwnedMutexGuard<()>>,
}

impl AssetGuard {
    pub fn asset_id(&self) -> &str {
        &self.asset_id
    }
}

impl Drop for AssetGuard {
    fn drop(&mut self) {
        // release before inspecting the count so our own reference is gone
        drop(self.guard.take());

        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = registry.get(&self.asset_id)
            && Arc::strong_count(entry) == 1
        {
            registry.remove(&self.asset_id);
        }
    }
}
