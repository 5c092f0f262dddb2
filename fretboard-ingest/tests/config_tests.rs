//! IngestConfig loading: TOML, environment overrides and defaults
//!
//! Tests touching environment variables run serially.

use fretboard_ingest::cache::ResultCache;
use fretboard_ingest::config::{CacheBackend, IngestConfig, ENV_CACHE_DB, ENV_SERVER_URL};
use serde_json::json;
use serial_test::serial;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

fn clear_env() {
    std::env::remove_var(ENV_SERVER_URL);
    std::env::remove_var(ENV_CACHE_DB);
}

#[test]
#[serial]
fn test_missing_file_yields_defaults() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();

    let config = IngestConfig::load(&temp_dir.path().join("ingest.toml")).unwrap();

    assert_eq!(config, IngestConfig::default());
    assert_eq!(config.server_url, "http://localhost:8000");
    assert_eq!(config.cache.backend, CacheBackend::Sqlite);
}

#[test]
#[serial]
fn test_toml_values_loaded() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("ingest.toml");
    std::fs::write(
        &path,
        r#"
server_url = "https://api.fretboard.test"

[polling]
interval_ms = 500
max_attempts = 10

[cache]
backend = "memory"
capacity = 20
ttl_days = 0
"#,
    )
    .unwrap();

    let config = IngestConfig::load(&path).unwrap();

    assert_eq!(config.server_url, "https://api.fretboard.test");
    let poller = config.poller_config();
    assert_eq!(poller.interval, Duration::from_millis(500));
    assert_eq!(poller.max_attempts, 10);
    // Unspecified keys keep their defaults
    assert_eq!(poller.max_consecutive_errors, 3);
    assert_eq!(config.cache.backend, CacheBackend::Memory);
    assert_eq!(config.cache_policy().capacity, 20);
    assert_eq!(config.cache_policy().ttl, None);
}

#[test]
#[serial]
fn test_environment_overrides_toml() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("ingest.toml");
    std::fs::write(&path, "server_url = \"http://from-toml:8000\"\n").unwrap();

    std::env::set_var(ENV_SERVER_URL, "http://from-env:9000");
    std::env::set_var(ENV_CACHE_DB, "/tmp/fretboard-env.db");
    let config = IngestConfig::load(&path).unwrap();
    clear_env();

    assert_eq!(config.server_url, "http://from-env:9000");
    assert_eq!(
        config.cache_database(temp_dir.path()),
        PathBuf::from("/tmp/fretboard-env.db")
    );
}

#[test]
#[serial]
fn test_empty_environment_value_ignored() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();

    std::env::set_var(ENV_SERVER_URL, "  ");
    let config = IngestConfig::load(&temp_dir.path().join("ingest.toml")).unwrap();
    clear_env();

    assert_eq!(config.server_url, "http://localhost:8000");
}

#[test]
#[serial]
fn test_invalid_toml_rejected() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("ingest.toml");
    std::fs::write(&path, "[cache]\nbackend = \"redis\"\n").unwrap();

    assert!(IngestConfig::load(&path).is_err());
}

#[test]
#[serial]
fn test_zero_attempts_rejected() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("ingest.toml");
    std::fs::write(&path, "[polling]\nmax_attempts = 0\n").unwrap();

    assert!(IngestConfig::load(&path).is_err());
}

#[tokio::test]
async fn test_open_sqlite_cache_in_data_folder() {
    let temp_dir = TempDir::new().unwrap();
    let config = IngestConfig::default();

    let cache = config.open_cache(temp_dir.path()).await.unwrap();
    cache.put("song-1", &json!({"title": "Persisted"})).await.unwrap();

    assert!(temp_dir.path().join("result_cache.db").exists());
    assert_eq!(cache.len().await.unwrap(), 1);
}

#[tokio::test]
async fn test_open_memory_cache() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = IngestConfig::default();
    config.cache.backend = CacheBackend::Memory;

    let cache = config.open_cache(temp_dir.path()).await.unwrap();
    cache.put("song-1", &json!({})).await.unwrap();

    assert_eq!(cache.get("song-1").await.unwrap(), Some(json!({})));
    assert!(!temp_dir.path().join("result_cache.db").exists());
}

#[tokio::test]
async fn test_open_sqlite_cache_creates_missing_folders() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("nested").join("deeper").join("songs.db");
    let mut config = IngestConfig::default();
    config.apply_overrides(None, Some(db_path.clone())).unwrap();

    let cache = config.open_cache(temp_dir.path()).await.unwrap();
    cache.put("song-1", &json!({"title": "Nested"})).await.unwrap();

    assert!(db_path.exists());
    assert_eq!(cache.len().await.unwrap(), 1);
}
