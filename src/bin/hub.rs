use std::sync::Arc;

use aas_monitor::{
    Hub,
    actors::{NotifierHandle, RetentionHandle, SweepHandle},
    config::{Config, StorageConfig, read_config_file},
    seed::seed_sample_data,
    storage::{MemoryBackend, StorageBackend},
    util::apply_env_overrides,
};
use clap::Parser;
use tracing::{info, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file; built-in defaults when omitted
    #[arg(short)]
    file: Option<String>,
}

fn init(log_level: &str) {
    let level = log_level.parse().unwrap_or(LevelFilter::INFO);
    let filter = filter::Targets::new().with_targets(vec![
        ("aas_monitor", level),
        ("aas_hub", level),
        ("tower_http", LevelFilter::DEBUG.min(level)),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

async fn open_backend(config: &StorageConfig) -> anyhow::Result<Arc<dyn StorageBackend>> {
    match config {
        StorageConfig::None => {
            warn!("running without persistence, all data is lost on shutdown");
            Ok(Arc::new(MemoryBackend::new()))
        }

        #[cfg(feature = "storage-sqlite")]
        StorageConfig::Sqlite { path } => {
            info!("opening SQLite database at {}", path.display());
            Ok(Arc::new(
                aas_monitor::storage::sqlite::SqliteBackend::new(path).await?,
            ))
        }

        #[cfg(not(feature = "storage-sqlite"))]
        StorageConfig::Sqlite { .. } => {
            anyhow::bail!("SQLite storage requested but the storage-sqlite feature is disabled")
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let mut config = match &args.file {
        Some(file) => read_config_file(file)?,
        None => Config::default(),
    };
    apply_env_overrides(&mut config);

    init(&config.log_level);
    trace!("started with args: {args:?}");

    let backend = open_backend(&config.storage.clone().unwrap_or_default()).await?;
    let hub = Hub::new(backend.clone(), &config)?;

    if config.seed_sample_data {
        let created = seed_sample_data(&hub.repository).await?;
        info!("seeded {created} sample assets");
    }

    let sweep = SweepHandle::spawn(hub.alerts.clone(), config.sweep_interval_secs);
    let retention = RetentionHandle::spawn(
        backend.clone(),
        config.retention.policy,
        config.retry,
        config.retention.interval_hours,
    );
    let notifier = config
        .webhook
        .clone()
        .map(|webhook| NotifierHandle::spawn(webhook, &hub.events));

    #[cfg(feature = "api")]
    {
        let state = aas_monitor::api::ApiState::new(hub.clone());
        let addr = aas_monitor::api::spawn_api_server(&config.api, state).await?;
        info!("serving API on http://{addr}/api/v1");
    }

    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    if let Err(e) = sweep.shutdown().await {
        warn!("{e:#}");
    }
    if let Err(e) = retention.shutdown().await {
        warn!("{e:#}");
    }
    if let Some(notifier) = notifier
        && let Err(e) = notifier.shutdown().await
    {
        warn!("{e:#}");
    }

    backend.close().await?;
    Ok(())
}
