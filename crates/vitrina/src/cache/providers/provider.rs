//! # Partition Store
//!
//! The trait every partition backend implements.

use async_trait::async_trait;

use crate::cache::types::{CacheKey, CacheResult};
use crate::fetch::Response;

/// One named partition holding at most one response per [`CacheKey`]
#[async_trait]
pub trait PartitionStore: Send + Sync {
    /// Name of the partition, e.g. `static-v3`
    fn name(&self) -> &str;

    /// Look up the stored response for a key
    async fn get(&self, key: &CacheKey) -> CacheResult<Option<Response>>;

    /// Store a response, replacing any previous entry for the key
    async fn put(&self, key: CacheKey, response: Response) -> CacheResult<()>;

    /// Remove an entry; returns whether it existed
    async fn remove(&self, key: &CacheKey) -> CacheResult<bool>;

    /// Keys of every stored entry, in no particular order
    async fn keys(&self) -> CacheResult<Vec<CacheKey>>;

    /// Number of stored entries
    async fn entry_count(&self) -> CacheResult<usize>;

    /// Drop every entry and release the backing storage
    async fn destroy(&self) -> CacheResult<()>;
}
