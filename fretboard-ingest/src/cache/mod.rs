//! Local result cache
//!
//! Completed result payloads keyed by song id. Consulted before re-issuing
//! work; a miss is a normal signal, not an error. Both backends are bounded
//! (least-recently-used eviction at `capacity`) and optionally expire entries
//! after `ttl`.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryResultCache;
pub use sqlite::SqliteResultCache;

use crate::error::IngestResult;
use std::time::Duration;

/// Default maximum number of cached songs
pub const DEFAULT_CAPACITY: usize = 500;
/// Default entry lifetime
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Bounds applied by every cache backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// Maximum number of entries; least recently used entries are evicted beyond it
    pub capacity: usize,
    /// Entries older than this read as misses; `None` disables expiry
    pub ttl: Option<Duration>,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            ttl: Some(DEFAULT_TTL),
        }
    }
}

/// Keyed store of raw result payloads
///
/// Implementations must tolerate concurrent reads and writes; writes to the
/// same key are last-writer-wins.
#[async_trait::async_trait]
pub trait ResultCache: Send + Sync {
    async fn get(&self, song_id: &str) -> IngestResult<Option<serde_json::Value>>;

    async fn put(&self, song_id: &str, payload: &serde_json::Value) -> IngestResult<()>;

    async fn remove(&self, song_id: &str) -> IngestResult<bool>;

    async fn len(&self) -> IngestResult<usize>;
}
