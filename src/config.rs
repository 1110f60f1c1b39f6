use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub source: SourceConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeliveryConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub mode: DeliveryMode,
}

/// How the orchestrator hands a record to the sink.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// Enqueue only; deliver directly only when the enqueue fails.
    #[default]
    Queued,
    /// Enqueue and always deliver directly as well.
    Dual,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CheckpointConfig {
    #[serde(default = "default_checkpoint_file")]
    pub file_path: PathBuf,
    #[serde(default = "default_checkpoint_key")]
    pub redis_key: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedisConfig {
    #[serde(default = "default_redis_url")]
    pub url: String,
    #[serde(default = "default_queue_key")]
    pub queue_key: String,
    #[serde(default = "default_retry_interval_secs")]
    pub retry_interval_secs: u64,
    #[serde(default = "default_pop_timeout_secs")]
    pub pop_timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RoutingConfig {
    #[serde(default = "default_routing_file")]
    pub file: PathBuf,
}

/// Settings for the bundled log-source adapter.
///
/// The replication connection itself belongs to the external binlog client
/// that produces the event stream, so no connection parameters live here.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct SourceConfig {
    /// NDJSON event file to follow. Standard input when unset.
    #[serde(default)]
    pub events: Option<PathBuf>,
}

impl Config {
    /// Loads the configuration from `path` (optional) layered with
    /// `BINLOG_RELAY_*` environment variables.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).required(false))
            .add_source(
                config::Environment::with_prefix("BINLOG_RELAY")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        settings.try_deserialize()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            delivery: DeliveryConfig::default(),
            checkpoint: CheckpointConfig::default(),
            redis: RedisConfig::default(),
            routing: RoutingConfig::default(),
            source: SourceConfig::default(),
        }
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            mode: DeliveryMode::default(),
        }
    }
}

impl DeliveryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            file_path: default_checkpoint_file(),
            redis_key: default_checkpoint_key(),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            queue_key: default_queue_key(),
            retry_interval_secs: default_retry_interval_secs(),
            pop_timeout_secs: default_pop_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl RedisConfig {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }

    pub fn pop_timeout(&self) -> Duration {
        Duration::from_secs(self.pop_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            file: default_routing_file(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_checkpoint_file() -> PathBuf {
    PathBuf::from("./storage/binlog_position.json")
}

fn default_checkpoint_key() -> String {
    "binlog_position".to_string()
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_queue_key() -> String {
    "cdc_events".to_string()
}

fn default_retry_interval_secs() -> u64 {
    5
}

fn default_pop_timeout_secs() -> u64 {
    5
}

fn default_connect_timeout_secs() -> u64 {
    2
}

fn default_routing_file() -> PathBuf {
    PathBuf::from("./config/table_groups.yaml")
}
