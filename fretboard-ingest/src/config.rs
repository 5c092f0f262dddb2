//! Configuration for fretboard-ingest
//!
//! **Priority:** CLI flags → environment → TOML (`ingest.toml`) → defaults
//!
//! ```toml
//! server_url = "http://localhost:8000"
//!
//! [polling]
//! interval_ms = 3000
//! max_attempts = 60
//! max_consecutive_errors = 3
//! request_timeout_secs = 30
//!
//! [cache]
//! backend = "sqlite"   # or "memory"
//! capacity = 500
//! ttl_days = 30        # 0 disables expiry
//! # database = "/path/to/result_cache.db"
//! ```

use crate::cache::{CachePolicy, MemoryResultCache, ResultCache, SqliteResultCache};
use crate::error::IngestResult;
use crate::services::PollerConfig;
use fretboard_common::config::load_toml;
use fretboard_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Environment variable overriding the config file location
pub const ENV_CONFIG_PATH: &str = "FRETBOARD_INGEST_CONFIG";
/// Environment variable overriding the data folder
pub const ENV_DATA_FOLDER: &str = "FRETBOARD_DATA_FOLDER";
/// Environment variable overriding `server_url`
pub const ENV_SERVER_URL: &str = "FRETBOARD_SERVER_URL";
/// Environment variable overriding `cache.database`
pub const ENV_CACHE_DB: &str = "FRETBOARD_CACHE_DB";

/// Config file name inside the platform config folder
pub const CONFIG_FILE_NAME: &str = "ingest.toml";
/// Cache database file name inside the data folder
pub const CACHE_DB_FILE_NAME: &str = "result_cache.db";

/// fretboard-ingest configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Analysis server base URL
    pub server_url: String,
    pub polling: PollingSettings,
    pub cache: CacheSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingSettings {
    pub interval_ms: u64,
    pub max_attempts: u32,
    pub max_consecutive_errors: u32,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub backend: CacheBackend,
    pub capacity: usize,
    pub ttl_days: u64,
    /// Defaults to `<data folder>/result_cache.db`
    pub database: Option<PathBuf>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8000".to_string(),
            polling: PollingSettings::default(),
            cache: CacheSettings::default(),
        }
    }
}

impl Default for PollingSettings {
    fn default() -> Self {
        let poller = PollerConfig::default();
        Self {
            interval_ms: poller.interval.as_millis() as u64,
            max_attempts: poller.max_attempts,
            max_consecutive_errors: poller.max_consecutive_errors,
            request_timeout_secs: 30,
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Sqlite,
            capacity: crate::cache::DEFAULT_CAPACITY,
            ttl_days: 30,
            database: None,
        }
    }
}

impl IngestConfig {
    /// Load from TOML (missing file = defaults), then apply environment overrides
    pub fn load(path: &Path) -> Result<Self> {
        let mut config: Self = load_toml(path)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_env(&mut self) {
        if let Some(url) = non_empty_env(ENV_SERVER_URL) {
            info!("Server URL loaded from environment variable");
            self.server_url = url;
        }
        if let Some(db) = non_empty_env(ENV_CACHE_DB) {
            info!("Cache database path loaded from environment variable");
            self.cache.database = Some(PathBuf::from(db));
        }
    }

    /// Apply command-line overrides, then validate the result again
    pub fn apply_overrides(
        &mut self,
        server_url: Option<String>,
        cache_db: Option<PathBuf>,
    ) -> Result<()> {
        if let Some(url) = server_url {
            self.server_url = url;
        }
        if let Some(db) = cache_db {
            self.cache.database = Some(db);
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if self.server_url.trim().is_empty() {
            return Err(Error::Config("server_url must not be empty".to_string()));
        }
        if self.polling.interval_ms == 0 {
            return Err(Error::Config("polling.interval_ms must be positive".to_string()));
        }
        if self.polling.max_attempts == 0 {
            return Err(Error::Config("polling.max_attempts must be positive".to_string()));
        }
        if self.polling.max_consecutive_errors == 0 {
            return Err(Error::Config(
                "polling.max_consecutive_errors must be positive".to_string(),
            ));
        }
        if self.cache.capacity == 0 {
            return Err(Error::Config("cache.capacity must be positive".to_string()));
        }
        Ok(())
    }

    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            interval: Duration::from_millis(self.polling.interval_ms),
            max_attempts: self.polling.max_attempts,
            max_consecutive_errors: self.polling.max_consecutive_errors,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.polling.request_timeout_secs)
    }

    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy {
            capacity: self.cache.capacity,
            ttl: (self.cache.ttl_days > 0)
                .then(|| Duration::from_secs(self.cache.ttl_days * 24 * 60 * 60)),
        }
    }

    /// Cache database location, resolved against the data folder
    pub fn cache_database(&self, data_folder: &Path) -> PathBuf {
        self.cache
            .database
            .clone()
            .unwrap_or_else(|| data_folder.join(CACHE_DB_FILE_NAME))
    }

    /// Open the configured cache backend
    pub async fn open_cache(&self, data_folder: &Path) -> IngestResult<Arc<dyn ResultCache>> {
        let policy = self.cache_policy();
        match self.cache.backend {
            CacheBackend::Memory => {
                info!(capacity = policy.capacity, "Using in-memory result cache");
                Ok(Arc::new(MemoryResultCache::new(policy)))
            }
            CacheBackend::Sqlite => {
                let db_path = self.cache_database(data_folder);
                info!(path = %db_path.display(), capacity = policy.capacity, "Using SQLite result cache");
                Ok(Arc::new(SqliteResultCache::open(&db_path, policy).await?))
            }
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
