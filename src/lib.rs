pub mod actors;
pub mod alerting;
#[cfg(feature = "api")]
pub mod api;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod explorer;
pub mod ingest;
pub mod locks;
pub mod model;
pub mod repository;
pub mod seed;
pub mod storage;
pub mod util;

use std::sync::Arc;

use alerting::{AlertEngine, AlertService, RuleSet};
use config::Config;
use context::Context;
use error::AasResult;
use events::{DEFAULT_EVENT_CAPACITY, EventBus};
use explorer::Explorer;
use ingest::MetricIngestor;
use repository::AasRepository;
use storage::{MemoryBackend, StorageBackend};

/// All services of one hub, sharing a single backend, lock table and event bus
#[derive(Clone)]
pub struct Hub {
    pub repository: AasRepository,
    pub ingestor: MetricIngestor,
    pub alerts: AlertService,
    pub explorer: Explorer,
    pub events: EventBus,
    ctx: Context,
}

impl Hub {
    pub fn new(backend: Arc<dyn StorageBackend>, config: &Config) -> AasResult<Self> {
        let rules = RuleSet::new(config.rules.clone())?;
        let events = EventBus::new(DEFAULT_EVENT_CAPACITY);
        let ctx = Context::new(backend, config.retry, events.clone());

        let alerts = AlertService::new(ctx.clone(), AlertEngine::new(Arc::new(rules)));
        let ingestor = MetricIngestor::new(ctx.clone(), alerts.clone(), config.metric_bounds.clone());

        Ok(Self {
            repository: AasRepository::new(ctx.clone()),
            explorer: Explorer::new(ctx.clone()),
            ingestor,
            alerts,
            events,
            ctx,
        })
    }

    /// Hub over a fresh in-memory backend
    pub fn in_memory(config: &Config) -> AasResult<Self> {
        Self::new(Arc::new(MemoryBackend::new()), config)
    }

    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.ctx.backend
    }

    pub fn locks(&self) -> &locks::AssetLocks {
        &self.ctx.locks
    }
}
