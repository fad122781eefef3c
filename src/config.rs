use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;

use tracing::trace;

use crate::alerting::{AlertRule, CompareOp, Severity};
use crate::ingest::{MetricBounds, default_metric_bounds};
use crate::model::DEFAULT_SERVICE_METRIC;
use crate::storage::{RetentionPolicy, RetryPolicy};

/// Storage backend configuration
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// In-memory storage (no persistence)
    #[serde(rename = "none")]
    None,

    /// SQLite database (default for most deployments)
    Sqlite {
        /// Path to the SQLite database file
        #[serde(default = "default_sqlite_path")]
        path: PathBuf,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Sqlite {
            path: default_sqlite_path(),
        }
    }
}

fn default_sqlite_path() -> PathBuf {
    PathBuf::from("./aas.db")
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct RetentionConfig {
    #[serde(flatten)]
    pub policy: RetentionPolicy,

    /// Hours between retention runs
    #[serde(default = "default_retention_interval")]
    pub interval_hours: u32,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            policy: RetentionPolicy::default(),
            interval_hours: default_retention_interval(),
        }
    }
}

fn default_retention_interval() -> u32 {
    24
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_bind_addr")]
    pub bind: SocketAddr,

    /// Bearer token required on every route except health
    pub token: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: default_bind_addr(),
            token: None,
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Webhook {
    pub url: String,

    /// Only notify for alerts at or above this severity
    pub min_severity: Option<Severity>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    /// Storage configuration (optional - defaults to SQLite)
    pub storage: Option<StorageConfig>,

    #[serde(default)]
    pub retention: RetentionConfig,

    #[serde(default = "default_rules")]
    pub rules: Vec<AlertRule>,

    /// Accepted value range per metric name
    #[serde(default = "default_metric_bounds")]
    pub metric_bounds: HashMap<String, MetricBounds>,

    #[serde(default)]
    pub retry: RetryPolicy,

    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Load the demo factory assets into an empty repository
    #[serde(default)]
    pub seed_sample_data: bool,

    pub webhook: Option<Webhook>,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: None,
            retention: RetentionConfig::default(),
            rules: default_rules(),
            metric_bounds: default_metric_bounds(),
            retry: RetryPolicy::default(),
            sweep_interval_secs: default_sweep_interval(),
            seed_sample_data: false,
            webhook: None,
            api: ApiConfig::default(),
            log_level: default_log_level(),
        }
    }
}

fn default_sweep_interval() -> u64 {
    300
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Factory dashboard thresholds
pub fn default_rules() -> Vec<AlertRule> {
    vec![
        AlertRule::threshold(
            "service-hours-warning",
            DEFAULT_SERVICE_METRIC,
            CompareOp::GreaterThan,
            2000.0,
            0.0,
            Severity::Warning,
        )
        .with_name("Maintenance required soon"),
        AlertRule::threshold(
            "service-hours-high",
            DEFAULT_SERVICE_METRIC,
            CompareOp::GreaterThan,
            2500.0,
            0.0,
            Severity::High,
        )
        .with_name("Maintenance overdue"),
        AlertRule::threshold(
            "low-efficiency",
            "efficiency",
            CompareOp::LessThan,
            85.0,
            2.0,
            Severity::Warning,
        )
        .with_name("Low efficiency"),
        AlertRule::threshold(
            "high-temperature",
            "temperature",
            CompareOp::GreaterThan,
            60.0,
            2.0,
            Severity::High,
        )
        .with_name("High temperature"),
        AlertRule::maintenance_due("maintenance-due").with_name("Maintenance due"),
    ]
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    serde_json::from_str(&file_content)
        .map_err(|e| anyhow::anyhow!("Invalid configuration file provided: {e}"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}
