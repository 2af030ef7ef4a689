use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use tracing::trace;

use crate::util::env_parse;

/// Period of the generation timer
pub const GENERATION_PERIOD: Duration = Duration::from_millis(2000);

/// History older than this is removed from the durable store
pub const RETENTION_HORIZON: Duration = Duration::from_secs(24 * 60 * 60);

/// Minimum time between two retention sweeps
pub const RETENTION_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Number of readings returned by a window read when the caller gives no count
pub const DEFAULT_WINDOW: i64 = 120;

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
    PathBuf::from("./pulse.db")
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct MonitorConfig {
    /// Minimum time between two alert emails, in milliseconds
    #[serde(default = "default_min_email_interval_ms")]
    pub min_email_interval_ms: u64,

    /// Capacity of the in-memory ring buffer
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            min_email_interval_ms: default_min_email_interval_ms(),
            history_capacity: default_history_capacity(),
        }
    }
}

impl MonitorConfig {
    /// `EMAIL_MIN_INTERVAL_MS` overrides the configured interval.
    pub fn apply_env(mut self) -> Self {
        self.min_email_interval_ms = env_parse("EMAIL_MIN_INTERVAL_MS", self.min_email_interval_ms);
        self
    }

    pub fn min_email_interval(&self) -> Duration {
        Duration::from_millis(self.min_email_interval_ms)
    }

    /// The buffer always keeps at least the newest reading.
    pub fn capacity(&self) -> usize {
        self.history_capacity.max(1)
    }
}

fn default_min_email_interval_ms() -> u64 {
    3 * 60 * 1000
}

fn default_history_capacity() -> usize {
    300
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ApiSettings {
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,

    #[serde(default = "default_enable_cors")]
    pub enable_cors: bool,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            enable_cors: default_enable_cors(),
        }
    }
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_enable_cors() -> bool {
    true
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Storage configuration (defaults to SQLite at `./pulse.db`)
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub api: ApiSettings,

    /// Fixed alert recipients, used when no session store is available
    #[serde(default)]
    pub recipients: Vec<String>,
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    serde_json::from_str(&file_content)
        .map_err(|e| anyhow::anyhow!("Invalid configuration file provided: {e}"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}
