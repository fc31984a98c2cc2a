//! # Strategy Engine
//!
//! The three fetch strategies. Lookups search every partition; writes go to
//! the partition the router picked, and only exactly-200 responses are stored.

use std::sync::Arc;

use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use crate::cache::{CacheKey, CacheStorage, PartitionNames};
use crate::fetch::{Fetcher, Request, Response};
use crate::router::{Route, Strategy};
use crate::WorkerError;

#[derive(Clone)]
pub struct StrategyEngine {
    storage: Arc<CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    names: PartitionNames,
    /// Detached refreshes; callers never wait on these
    background: TaskTracker,
}

impl StrategyEngine {
    pub fn new(storage: Arc<CacheStorage>, fetcher: Arc<dyn Fetcher>, names: PartitionNames) -> Self {
        Self {
            storage,
            fetcher,
            names,
            background: TaskTracker::new(),
        }
    }

    /// Serve a request with the routed strategy and partition
    pub async fn execute(&self, route: Route, request: &Request) -> Result<Response, WorkerError> {
        let partition = self.names.name(route.partition);
        match route.strategy {
            Strategy::CacheFirst => self.cache_first(request, partition).await,
            Strategy::StaleWhileRevalidate => self.stale_while_revalidate(request, partition).await,
            Strategy::NetworkFirst => self.network_first(request, partition).await,
        }
    }

    /// Cached entry if present, otherwise the network (stored on 200)
    pub async fn cache_first(&self, request: &Request, partition: &str) -> Result<Response, WorkerError> {
        let key = CacheKey::for_request(request);
        if let Some(cached) = self.storage.match_request(&key).await? {
            return Ok(cached);
        }

        let response = self.fetcher.fetch(request).await.inspect_err(|e| {
            debug!(url = %request.url, error = %e, "cache-first: network failed with no cached entry");
        })?;

        if response.is_cacheable() {
            self.store(partition, key, response.clone()).await;
        }

        Ok(response)
    }

    /// Cached entry immediately with a detached refresh, or the network
    /// result when nothing is cached
    pub async fn stale_while_revalidate(
        &self,
        request: &Request,
        partition: &str,
    ) -> Result<Response, WorkerError> {
        let key = CacheKey::for_request(request);

        if let Some(cached) = self.storage.match_request(&key).await? {
            let engine = self.clone();
            let request = request.clone();
            let partition = partition.to_string();
            self.background.spawn(async move {
                match engine.fetcher.fetch(&request).await {
                    Ok(fresh) if fresh.is_cacheable() => {
                        engine.store(&partition, key, fresh).await;
                    }
                    Ok(fresh) => {
                        debug!(url = %request.url, status = fresh.status, "Revalidation skipped non-200 response");
                    }
                    Err(e) => {
                        debug!(url = %request.url, error = %e, "Revalidation failed, keeping cached entry");
                    }
                }
            });
            return Ok(cached);
        }

        let response = self.fetcher.fetch(request).await?;
        if response.is_cacheable() {
            let engine = self.clone();
            let partition = partition.to_string();
            let copy = response.clone();
            self.background.spawn(async move {
                engine.store(&partition, key, copy).await;
            });
        }

        Ok(response)
    }

    /// Network (stored on 200), falling back to the cached entry on failure
    pub async fn network_first(&self, request: &Request, partition: &str) -> Result<Response, WorkerError> {
        let key = CacheKey::for_request(request);

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.is_cacheable() {
                    self.store(partition, key, response.clone()).await;
                }
                Ok(response)
            }
            Err(e) => match self.storage.match_request(&key).await? {
                Some(cached) => {
                    debug!(url = %request.url, "Serving from cache (offline)");
                    Ok(cached)
                }
                None => Err(e),
            },
        }
    }

    /// Write an entry; failures are logged and never reach the caller
    pub(crate) async fn store(&self, partition: &str, key: CacheKey, response: Response) {
        let result = match self.storage.open(partition).await {
            Ok(store) => store.put(key.clone(), response).await,
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            warn!(partition, url = %key.url, error = %e, "Failed to store response");
        }
    }

    /// Wait for every detached refresh spawned so far
    pub async fn settle(&self) {
        self.background.close();
        self.background.wait().await;
        self.background.reopen();
    }

    /// Detached refreshes and stores that have not finished yet
    pub fn pending_refreshes(&self) -> usize {
        self.background.len()
    }

    pub fn names(&self) -> &PartitionNames {
        &self.names
    }

    pub fn storage(&self) -> &Arc<CacheStorage> {
        &self.storage
    }

    pub fn fetcher(&self) -> &Arc<dyn Fetcher> {
        &self.fetcher
    }
}
