//! # Cache System
//!
//! Named, versioned cache partitions holding request → response entries.
//! [`CacheStorage`] is the process-wide registry of partitions; each
//! partition is a [`PartitionStore`] backed by memory or by disk.

mod partition;
pub mod providers;
mod storage;
mod types;

pub use partition::{PartitionKind, PartitionNames};
pub use storage::CacheStorage;
pub use types::{CacheBackend, CacheConfig, CacheKey, CacheResult};

pub use providers::{FilePartition, MemoryPartition, PartitionStore};
