//! # Cache Types
//!
//! This module defines common types used across the caching system.

use std::path::PathBuf;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::WorkerError;
use crate::fetch::{Request, ResponseHead};

/// Identity of a cached request: method plus normalized URL
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub method: Method,
    /// URL without its fragment
    pub url: String,
}

impl CacheKey {
    pub fn new(method: Method, url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        Self {
            method,
            url: url.into(),
        }
    }

    pub fn get(url: &Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn for_request(request: &Request) -> Self {
        Self::new(request.method.clone(), &request.url)
    }

    /// Rebuild a GET request for this key, used when re-fetching entries
    pub fn to_request(&self) -> Result<Request, WorkerError> {
        let url = Url::parse(&self.url)?;
        Ok(Request::new(self.method.clone(), url, Default::default()))
    }

    /// Convert to a filename-safe string
    pub fn to_filename(&self) -> String {
        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(self.method.as_str());
        hasher.update(" ");
        hasher.update(&self.url);

        let hash = hasher.finalize();
        format!("{hash:x}")
    }
}

/// On-disk metadata stored next to each cached body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct EntryMetadata {
    pub method: String,
    pub url: String,
    pub response: ResponseHead,
    /// Unix seconds when the entry was written
    pub cached_at: i64,
    pub size: u64,
}

impl EntryMetadata {
    pub fn key(&self) -> Option<CacheKey> {
        Some(CacheKey {
            method: Method::from_bytes(self.method.as_bytes()).ok()?,
            url: self.url.clone(),
        })
    }
}

/// Where partition contents live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Process memory; everything is lost on restart
    #[default]
    Memory,
    /// One directory per partition under the cache root
    Disk,
}

/// Configuration for the cache system
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    /// Root for disk partitions; the system temp dir is used when unset
    pub disk_cache_path: Option<PathBuf>,
}

impl CacheConfig {
    pub fn memory() -> Self {
        Self::default()
    }

    pub fn disk(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: CacheBackend::Disk,
            disk_cache_path: Some(path.into()),
        }
    }

    pub fn disk_root(&self) -> PathBuf {
        self.disk_cache_path
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("vitrina-cache"))
    }
}

/// Result of a cache operation
pub type CacheResult<T> = std::result::Result<T, WorkerError>;
