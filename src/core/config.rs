use anyhow::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::core::storage::{DEFAULT_QUOTA_BYTES, FileStore, MemoryStore, Storage};

pub const CONFIG_FILE: &str = "flowdash.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    /// Prefix every endpoint path is appended to, e.g. `http://127.0.0.1:8000/api`.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Origin used to absolutize relative link URLs when the backend omits `fullUrl`.
    #[serde(default = "default_public_origin")]
    pub public_origin: String,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_project")]
    pub default_project: String,

    #[serde(default)]
    pub logging: LogConfig,
}

/// Where persisted client state lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Only read by the file backend. Unset when the platform has no data directory.
    #[serde(default = "default_storage_path")]
    pub path: Option<PathBuf>,

    #[serde(default = "default_quota")]
    pub quota_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// `trace|debug|info|warn|error`.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Also print formatted lines to stdout.
    #[serde(default = "default_log_stdout")]
    pub stdout: bool,

    /// Lines a slow log viewer may lag behind before it skips ahead.
    #[serde(default = "default_mirror_capacity")]
    pub mirror_capacity: usize,
}

fn default_api_base() -> String {
    "http://127.0.0.1:8000/api".to_string()
}
fn default_public_origin() -> String {
    "http://127.0.0.1:8000".to_string()
}
fn default_request_timeout() -> u64 {
    120
}
fn default_project() -> String {
    "flow".to_string()
}
fn default_storage_path() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("flowdash").join("storage.json"))
}
fn default_quota() -> usize {
    DEFAULT_QUOTA_BYTES
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_stdout() -> bool {
    true
}
fn default_mirror_capacity() -> usize {
    256
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            stdout: default_log_stdout(),
            mirror_capacity: default_mirror_capacity(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: default_storage_path(),
            quota_bytes: default_quota(),
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            public_origin: default_public_origin(),
            storage: StorageConfig::default(),
            request_timeout_secs: default_request_timeout(),
            default_project: default_project(),
            logging: LogConfig::default(),
        }
    }
}

impl DashboardConfig {
    pub async fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let config_path = dir.as_ref().join(CONFIG_FILE);
        if !config_path.exists() {
            info!("No {} found, using defaults.", CONFIG_FILE);
            return Ok(Self::default());
        }
        let content = tokio::fs::read_to_string(&config_path).await?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let mut config: DashboardConfig = toml::from_str(content)?;
        config.normalize();
        info!(
            "Loaded dashboard config: api_base={}, project={}, storage={:?} {:?}",
            config.api_base, config.default_project, config.storage.backend, config.storage.path
        );
        Ok(config)
    }

    fn normalize(&mut self) {
        while self.api_base.ends_with('/') {
            self.api_base.pop();
        }
        while self.public_origin.ends_with('/') {
            self.public_origin.pop();
        }
        let project = self.default_project.trim().to_lowercase();
        self.default_project = match project.as_str() {
            "fulfilment" | "fulfillment" => "fulfilment".to_string(),
            "flow" => project,
            other => {
                info!("Unknown default project '{}', falling back to flow", other);
                "flow".to_string()
            }
        };
        if self.request_timeout_secs == 0 {
            self.request_timeout_secs = default_request_timeout();
        }
    }

    /// Opens the configured storage. The file backend without a usable path falls back to memory.
    pub fn open_storage(&self) -> Result<Storage> {
        let quota = self.storage.quota_bytes;
        match (self.storage.backend, &self.storage.path) {
            (StorageBackend::File, Some(path)) => Ok(Arc::new(FileStore::open(path, quota)?)),
            (StorageBackend::File, None) => {
                warn!("No data directory for file storage, keeping state in memory");
                Ok(Arc::new(MemoryStore::with_quota(quota)))
            }
            (StorageBackend::Memory, _) => Ok(Arc::new(MemoryStore::with_quota(quota))),
        }
    }
}
