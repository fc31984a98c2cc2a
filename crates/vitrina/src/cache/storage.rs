//! # Cache Storage
//!
//! The registry of every partition the worker can see, including partitions
//! left behind by earlier versions when the disk backend is used.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::WorkerError;
use crate::cache::providers::{FilePartition, MemoryPartition, PartitionStore};
use crate::cache::types::{CacheBackend, CacheConfig, CacheKey, CacheResult};
use crate::fetch::Response;

type Partition = Arc<dyn PartitionStore>;

/// Named partitions, kept in creation order
pub struct CacheStorage {
    backend: CacheBackend,
    root: PathBuf,
    partitions: RwLock<Vec<(String, Partition)>>,
}

impl CacheStorage {
    /// Open storage for the configured backend.
    ///
    /// For the disk backend, every existing directory under the root is
    /// registered as a partition so that stale versions can be evicted.
    pub async fn new(config: &CacheConfig) -> CacheResult<Self> {
        let root = config.disk_root();
        let storage = Self {
            backend: config.backend,
            root,
            partitions: RwLock::new(Vec::new()),
        };

        if storage.backend == CacheBackend::Disk {
            fs::create_dir_all(&storage.root).await?;
            storage.discover().await?;
        }

        Ok(storage)
    }

    /// Storage whose partitions live only in memory
    pub fn in_memory() -> Self {
        Self {
            backend: CacheBackend::Memory,
            root: PathBuf::new(),
            partitions: RwLock::new(Vec::new()),
        }
    }

    async fn discover(&self) -> CacheResult<()> {
        let mut entries = fs::read_dir(&self.root).await?;
        let mut found = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            if validate_name(&name).is_ok() {
                found.push(name);
            }
        }

        // Directory order is arbitrary; sort for a stable match order
        found.sort();
        debug!(root = ?self.root, partitions = ?found, "Discovered partitions on disk");

        let mut partitions = self.partitions.write();
        for name in found {
            let store: Partition = Arc::new(FilePartition::new(&self.root, name.clone()));
            partitions.push((name, store));
        }

        Ok(())
    }

    fn lookup(&self, name: &str) -> Option<Partition> {
        self.partitions
            .read()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, p)| p.clone())
    }

    /// Open a partition, creating it on first use
    pub async fn open(&self, name: &str) -> CacheResult<Partition> {
        if let Some(partition) = self.lookup(name) {
            return Ok(partition);
        }

        validate_name(name)?;

        let created: Partition = match self.backend {
            CacheBackend::Memory => Arc::new(MemoryPartition::new(name)),
            CacheBackend::Disk => {
                let partition = FilePartition::new(&self.root, name);
                fs::create_dir_all(partition.dir()).await?;
                Arc::new(partition)
            }
        };

        let mut partitions = self.partitions.write();
        // Another task may have created it while the directory was being made
        if let Some((_, existing)) = partitions.iter().find(|(n, _)| n == name) {
            return Ok(existing.clone());
        }
        partitions.push((name.to_string(), created.clone()));
        debug!(partition = name, "Opened new partition");

        Ok(created)
    }

    /// Existing partition, without creating it
    pub fn get(&self, name: &str) -> Option<Partition> {
        self.lookup(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Names of every partition, in creation order
    pub fn keys(&self) -> Vec<String> {
        self.partitions
            .read()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Delete a partition and all its entries; returns whether it existed.
    ///
    /// A partition whose contents cannot be removed stays registered.
    pub async fn delete(&self, name: &str) -> CacheResult<bool> {
        let removed = {
            let mut partitions = self.partitions.write();
            partitions
                .iter()
                .position(|(n, _)| n == name)
                .map(|index| partitions.remove(index).1)
        };

        match removed {
            Some(partition) => {
                if let Err(e) = partition.destroy().await {
                    warn!(partition = name, error = %e, "Failed to delete partition");
                    self.partitions.write().push((name.to_string(), partition));
                    return Err(e);
                }
                info!(partition = name, "Deleted partition");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// First stored response for the key across all partitions
    pub async fn match_request(&self, key: &CacheKey) -> CacheResult<Option<Response>> {
        let partitions: Vec<Partition> = self
            .partitions
            .read()
            .iter()
            .map(|(_, p)| p.clone())
            .collect();

        for partition in partitions {
            if let Some(response) = partition.get(key).await? {
                debug!(partition = partition.name(), url = %key.url, "Cache hit");
                return Ok(Some(response));
            }
        }

        Ok(None)
    }
}

impl std::fmt::Debug for CacheStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStorage")
            .field("backend", &self.backend)
            .field("root", &self.root)
            .field("partitions", &self.keys())
            .finish()
    }
}

fn validate_name(name: &str) -> CacheResult<()> {
    let invalid = name.is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\'])
        || name.chars().any(char::is_control);

    if invalid {
        return Err(WorkerError::InvalidPartition(name.to_string()));
    }
    Ok(())
}
