//! # Memory Partition
//!
//! In-memory partition backed by a Moka cache. The cache is unbounded and has
//! no TTL: entries leave only when replaced, removed, or when the whole
//! partition is evicted by version.

use moka::future::Cache as MokaCache;
use tracing::debug;

use crate::cache::providers::PartitionStore;
use crate::cache::types::{CacheKey, CacheResult};
use crate::fetch::Response;

/// Memory partition implementation using Moka
#[derive(Clone)]
pub struct MemoryPartition {
    name: String,
    cache: MokaCache<CacheKey, Response>,
}

impl MemoryPartition {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let cache = MokaCache::builder().name(&name).build();

        debug!(partition = %name, "Memory partition created");

        Self { name, cache }
    }
}

impl std::fmt::Debug for MemoryPartition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryPartition")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl PartitionStore for MemoryPartition {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &CacheKey) -> CacheResult<Option<Response>> {
        Ok(self.cache.get(key).await)
    }

    async fn put(&self, key: CacheKey, response: Response) -> CacheResult<()> {
        self.cache.insert(key, response).await;
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> CacheResult<bool> {
        let removed = self.cache.remove(key).await.is_some();
        if removed {
            debug!(partition = %self.name, url = %key.url, "Removed entry from memory partition");
        }
        Ok(removed)
    }

    async fn keys(&self) -> CacheResult<Vec<CacheKey>> {
        Ok(self.cache.iter().map(|(key, _)| (*key).clone()).collect())
    }

    async fn entry_count(&self) -> CacheResult<usize> {
        Ok(self.cache.iter().count())
    }

    async fn destroy(&self) -> CacheResult<()> {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
        debug!(partition = %self.name, "Memory partition destroyed");
        Ok(())
    }
}
