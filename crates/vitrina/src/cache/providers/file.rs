//! # File Partition
//!
//! A partition persisted as one directory. Each entry is a single
//! `<hash>.entry` file: one line of JSON metadata with the request identity
//! and the response head, followed by the raw response body.
//!
//! Writers stage the entry in a uniquely named temporary file and rename it
//! into place, so concurrent writes to one key never interleave and the
//! last rename wins.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use tokio::fs;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::cache::providers::PartitionStore;
use crate::cache::types::{CacheKey, CacheResult, EntryMetadata};
use crate::fetch::Response;

const ENTRY_EXTENSION: &str = "entry";
const TEMP_EXTENSION: &str = "tmp";

#[derive(Debug, Clone)]
pub struct FilePartition {
    name: String,
    dir: PathBuf,
}

impl FilePartition {
    /// Partition stored in `<root>/<name>`; the directory is created on first write
    pub fn new(root: &Path, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            dir: root.join(&name),
            name,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir
            .join(key.to_filename())
            .with_extension(ENTRY_EXTENSION)
    }

    fn temp_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!(
            "{}.{}.{TEMP_EXTENSION}",
            key.to_filename(),
            Uuid::new_v4().simple()
        ))
    }

    /// Split an entry file into its metadata and body.
    ///
    /// `None` when the header is unparsable or the body length disagrees
    /// with the recorded size.
    fn decode(path: &Path, bytes: Vec<u8>) -> Option<(EntryMetadata, Bytes)> {
        let Some(split) = bytes.iter().position(|&b| b == b'\n') else {
            warn!(path = ?path, "Cache entry has no header line");
            return None;
        };

        let metadata: EntryMetadata = match serde_json::from_slice(&bytes[..split]) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(path = ?path, error = %e, "Failed to parse cache metadata");
                return None;
            }
        };

        let body = Bytes::from(bytes).slice(split + 1..);
        if body.len() as u64 != metadata.size {
            warn!(path = ?path, expected = metadata.size, actual = body.len(), "Cache entry body is truncated");
            return None;
        }

        Some((metadata, body))
    }

    /// Read only the header line of an entry file
    async fn read_metadata(path: &Path) -> Option<EntryMetadata> {
        let file = match fs::File::open(path).await {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = ?path, error = %e, "Failed to open cache entry");
                return None;
            }
        };

        let mut header = Vec::new();
        if let Err(e) = BufReader::new(file).read_until(b'\n', &mut header).await {
            warn!(path = ?path, error = %e, "Failed to read cache entry header");
            return None;
        }

        serde_json::from_slice(header.strip_suffix(b"\n")?).ok()
    }

    /// Delete a broken entry without blocking the caller
    fn discard_in_background(&self, key: &CacheKey) {
        let entry_path = self.entry_path(key);
        tokio::spawn(async move {
            let _ = fs::remove_file(&entry_path).await;
        });
    }
}

#[async_trait::async_trait]
impl PartitionStore for FilePartition {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &CacheKey) -> CacheResult<Option<Response>> {
        let path = self.entry_path(key);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                warn!(partition = %self.name, url = %key.url, error = %e, "Failed to read cache entry");
                return Ok(None);
            }
        };

        match Self::decode(&path, bytes) {
            Some((metadata, body)) => Ok(Some(Response::from_parts(metadata.response, body))),
            None => {
                self.discard_in_background(key);
                Ok(None)
            }
        }
    }

    async fn put(&self, key: CacheKey, response: Response) -> CacheResult<()> {
        fs::create_dir_all(&self.dir).await?;

        let metadata = EntryMetadata {
            method: key.method.as_str().to_string(),
            url: key.url.clone(),
            response: response.head(),
            cached_at: chrono::Utc::now().timestamp(),
            size: response.body.len() as u64,
        };

        let mut contents = serde_json::to_vec(&metadata)?;
        contents.push(b'\n');
        contents.extend_from_slice(&response.body);

        let entry_path = self.entry_path(&key);
        let temp_path = self.temp_path(&key);

        if let Err(e) = fs::write(&temp_path, &contents).await {
            warn!(path = ?temp_path, error = %e, "Failed to write cache entry");
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        if let Err(e) = fs::rename(&temp_path, &entry_path).await {
            warn!(from = ?temp_path, to = ?entry_path, error = %e, "Failed to rename temporary entry file");
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        debug!(partition = %self.name, url = %key.url, "Stored entry on disk");
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> CacheResult<bool> {
        match fs::remove_file(self.entry_path(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => {
                warn!(partition = %self.name, url = %key.url, error = %e, "Failed to remove cache entry");
                Err(e.into())
            }
        }
    }

    async fn keys(&self) -> CacheResult<Vec<CacheKey>> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }
            if let Some(key) = Self::read_metadata(&path).await.and_then(|m| m.key()) {
                keys.push(key);
            }
        }

        Ok(keys)
    }

    async fn entry_count(&self) -> CacheResult<usize> {
        Ok(self.keys().await?.len())
    }

    async fn destroy(&self) -> CacheResult<()> {
        match fs::remove_dir_all(&self.dir).await {
            Ok(()) => {
                debug!(partition = %self.name, dir = ?self.dir, "Removed partition directory");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
