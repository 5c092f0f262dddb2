//! Persistent result cache (SQLite)
//!
//! Survives restarts, so a song processed in an earlier session opens
//! without touching the server. Recency is tracked with a monotonically
//! increasing `access_seq`; expiry uses wall-clock `created_at` (ms).

use super::{CachePolicy, ResultCache};
use crate::error::{IngestError, IngestResult};
use chrono::Utc;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;

/// SQLite-backed bounded result cache
pub struct SqliteResultCache {
    pool: SqlitePool,
    policy: CachePolicy,
}

impl SqliteResultCache {
    /// Open (creating if needed) the cache database at `db_path`
    pub async fn open(db_path: &Path, policy: CachePolicy) -> IngestResult<Self> {
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| IngestError::Cache(format!("{}: {}", parent.display(), e)))?;
        }

        // mode=rwc: read, write, create
        let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
        tracing::debug!("Connecting to cache database: {}", db_url);

        let pool = SqlitePool::connect(&db_url).await?;
        Self::from_pool(pool, policy).await
    }

    /// Private in-memory database, mainly for tests
    ///
    /// A single connection, since every SQLite `:memory:` connection is its own database.
    pub async fn in_memory(policy: CachePolicy) -> IngestResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::from_pool(pool, policy).await
    }

    /// Use an existing pool, creating the cache table if missing
    pub async fn from_pool(pool: SqlitePool, policy: CachePolicy) -> IngestResult<Self> {
        init_tables(&pool).await?;
        Ok(Self { pool, policy })
    }

    async fn evict_beyond_capacity(&self) -> IngestResult<()> {
        let evicted = sqlx::query(
            r#"
            DELETE FROM result_cache
            WHERE song_id NOT IN (
                SELECT song_id FROM result_cache ORDER BY access_seq DESC LIMIT ?
            )
            "#,
        )
        .bind(self.policy.capacity.max(1) as i64)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if evicted > 0 {
            tracing::debug!(evicted, "Evicted least recently used cache entries");
        }
        Ok(())
    }

    fn is_expired(&self, created_at_ms: i64) -> bool {
        match self.policy.ttl {
            Some(ttl) => {
                let age_ms = Utc::now().timestamp_millis().saturating_sub(created_at_ms);
                age_ms >= ttl.as_millis() as i64
            }
            None => false,
        }
    }
}

async fn init_tables(pool: &SqlitePool) -> IngestResult<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS result_cache (
            song_id TEXT PRIMARY KEY,
            payload TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            access_seq INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[async_trait::async_trait]
impl ResultCache for SqliteResultCache {
    async fn get(&self, song_id: &str) -> IngestResult<Option<serde_json::Value>> {
        let row = sqlx::query_as::<_, (String, i64)>(
            "SELECT payload, created_at FROM result_cache WHERE song_id = ?",
        )
        .bind(song_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some((payload, created_at)) = row else {
            return Ok(None);
        };

        if self.is_expired(created_at) {
            tracing::debug!(song_id = %song_id, "Cache entry expired");
            self.remove(song_id).await?;
            return Ok(None);
        }

        sqlx::query(
            r#"
            UPDATE result_cache
            SET access_seq = (SELECT COALESCE(MAX(access_seq), 0) + 1 FROM result_cache)
            WHERE song_id = ?
            "#,
        )
        .bind(song_id)
        .execute(&self.pool)
        .await?;

        let value = serde_json::from_str(&payload)
            .map_err(|e| IngestError::Cache(format!("corrupt entry {}: {}", song_id, e)))?;
        Ok(Some(value))
    }

    async fn put(&self, song_id: &str, payload: &serde_json::Value) -> IngestResult<()> {
        let json = serde_json::to_string(payload)
            .map_err(|e| IngestError::Cache(format!("serialize {}: {}", song_id, e)))?;

        sqlx::query(
            r#"
            INSERT INTO result_cache (song_id, payload, created_at, access_seq)
            VALUES (?, ?, ?, (SELECT COALESCE(MAX(access_seq), 0) + 1 FROM result_cache))
            ON CONFLICT(song_id) DO UPDATE SET
                payload = excluded.payload,
                created_at = excluded.created_at,
                access_seq = excluded.access_seq
            "#,
        )
        .bind(song_id)
        .bind(json)
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;

        self.evict_beyond_capacity().await
    }

    async fn remove(&self, song_id: &str) -> IngestResult<bool> {
        let result = sqlx::query("DELETE FROM result_cache WHERE song_id = ?")
            .bind(song_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn len(&self) -> IngestResult<usize> {
        let (count,) = sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM result_cache")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }
}
