//! # Partition Providers
//!
//! Storage backends for a single cache partition.

pub use self::file::FilePartition;
pub use self::memory::MemoryPartition;
pub use self::provider::PartitionStore;

// Provider interface
pub mod provider;

// Individual provider implementations
pub mod file;
pub mod memory;
