//! In-process result cache

use super::{CachePolicy, ResultCache};
use crate::error::IngestResult;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tokio::time::Instant;

struct Entry {
    payload: serde_json::Value,
    created_at: Instant,
    /// Monotonic access stamp; smallest is least recently used
    last_access: u64,
}

struct Inner {
    entries: HashMap<String, Entry>,
    clock: u64,
}

impl Inner {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn evict_lru(&mut self) -> Option<String> {
        let victim = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_access)
            .map(|(key, _)| key.clone())?;
        self.entries.remove(&victim);
        Some(victim)
    }
}

/// Bounded LRU cache held in memory for the lifetime of the process
pub struct MemoryResultCache {
    inner: Mutex<Inner>,
    policy: CachePolicy,
}

impl MemoryResultCache {
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                clock: 0,
            }),
            policy,
        }
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }
}

impl Default for MemoryResultCache {
    fn default() -> Self {
        Self::new(CachePolicy::default())
    }
}

#[async_trait::async_trait]
impl ResultCache for MemoryResultCache {
    async fn get(&self, song_id: &str) -> IngestResult<Option<serde_json::Value>> {
        let mut inner = self.inner.lock().await;

        let expired = match inner.entries.get(song_id) {
            None => return Ok(None),
            Some(entry) => self
                .policy
                .ttl
                .is_some_and(|ttl| entry.created_at.elapsed() >= ttl),
        };
        if expired {
            inner.entries.remove(song_id);
            tracing::debug!(song_id = %song_id, "Cache entry expired");
            return Ok(None);
        }

        let stamp = inner.tick();
        Ok(inner.entries.get_mut(song_id).map(|entry| {
            entry.last_access = stamp;
            entry.payload.clone()
        }))
    }

    async fn put(&self, song_id: &str, payload: &serde_json::Value) -> IngestResult<()> {
        let mut inner = self.inner.lock().await;
        let stamp = inner.tick();

        inner.entries.insert(
            song_id.to_string(),
            Entry {
                payload: payload.clone(),
                created_at: Instant::now(),
                last_access: stamp,
            },
        );

        while inner.entries.len() > self.policy.capacity.max(1) {
            if let Some(evicted) = inner.evict_lru() {
                tracing::debug!(song_id = %evicted, "Evicted least recently used cache entry");
            }
        }
        Ok(())
    }

    async fn remove(&self, song_id: &str) -> IngestResult<bool> {
        Ok(self.inner.lock().await.entries.remove(song_id).is_some())
    }

    async fn len(&self) -> IngestResult<usize> {
        Ok(self.inner.lock().await.entries.len())
    }
}
