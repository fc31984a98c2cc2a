use std::sync::atomic::Ordering;

use futures::future::{join_all, try_join_all};
use tracing::{debug, error, info, warn};

use crate::WorkerError;
use crate::cache::{CacheKey, PartitionKind};
use crate::fetch::{Request, Response};
use crate::worker::{CacheWorker, WorkerState};

impl CacheWorker {
    fn transition(
        &self,
        operation: &'static str,
        from: WorkerState,
        to: WorkerState,
    ) -> Result<(), WorkerError> {
        let mut state = self.state.write();
        if *state != from {
            return Err(WorkerError::InvalidState {
                operation,
                state: *state,
            });
        }
        *state = to;
        debug!(from = ?from, to = ?to, "Worker state changed");
        Ok(())
    }

    fn set_state(&self, to: WorkerState) {
        *self.state.write() = to;
    }

    /// Pre-cache the static asset list into the static partition.
    ///
    /// All assets are fetched before anything is written, so a single
    /// failure leaves the storage untouched and the worker redundant.
    pub async fn install(&self) -> Result<(), WorkerError> {
        self.transition("install", WorkerState::Parsed, WorkerState::Installing)?;
        info!(version = %self.config.version, "Installing worker");

        match self.precache().await {
            Ok(count) => {
                self.set_state(WorkerState::Waiting);
                self.skip_waiting.store(true, Ordering::SeqCst);
                info!(assets = count, "Worker installed");
                Ok(())
            }
            Err(e) => {
                self.set_state(WorkerState::Redundant);
                error!(error = %e, "Install failed, worker is redundant");
                Err(e)
            }
        }
    }

    async fn precache(&self) -> Result<usize, WorkerError> {
        let urls = self.config.static_asset_urls()?;
        let fetcher = self.engine.fetcher();

        let fetched = try_join_all(urls.into_iter().map(|url| async move {
            let request = Request::get(url);
            let response = fetcher
                .fetch(&request)
                .await
                .map_err(|e| WorkerError::InstallFailed {
                    url: request.url.to_string(),
                    reason: e.to_string(),
                })?;

            if !response.is_cacheable() {
                return Err(WorkerError::InstallFailed {
                    url: request.url.to_string(),
                    reason: format!("status {} {}", response.status, response.status_text),
                });
            }

            Ok::<(CacheKey, Response), WorkerError>((CacheKey::for_request(&request), response))
        }))
        .await?;

        let name = self.names.name(PartitionKind::Static);
        let partition = self.storage.open(name).await?;
        let count = fetched.len();

        for (key, response) in fetched {
            if let Err(e) = partition.put(key, response).await {
                // Do not leave a half-filled static partition behind
                if let Err(cleanup) = self.storage.delete(name).await {
                    warn!(partition = name, error = %cleanup, "Failed to discard partial partition");
                }
                return Err(e);
            }
        }

        Ok(count)
    }

    /// Evict partitions of other versions and take control of open pages.
    ///
    /// Returns the names of the deleted partitions.
    pub async fn activate(&self) -> Result<Vec<String>, WorkerError> {
        self.transition("activate", WorkerState::Waiting, WorkerState::Activating)?;
        info!(version = %self.config.version, "Activating worker");

        let stale: Vec<String> = self
            .storage
            .keys()
            .into_iter()
            .filter(|name| self.names.is_stale(name))
            .collect();

        let results = join_all(stale.iter().map(|name| self.storage.delete(name))).await;

        let mut deleted = Vec::with_capacity(stale.len());
        for (name, result) in stale.into_iter().zip(results) {
            match result {
                Ok(true) => {
                    info!(partition = %name, "Evicted stale partition");
                    deleted.push(name);
                }
                Ok(false) => {}
                Err(e) => warn!(partition = %name, error = %e, "Failed to evict stale partition"),
            }
        }

        if let Err(e) = self.host.claim_clients().await {
            warn!(error = %e, "Failed to claim clients");
        }

        self.set_state(WorkerState::Active);
        info!(version = %self.config.version, evicted = deleted.len(), "Worker active");

        Ok(deleted)
    }

    /// Ask to activate without waiting for old pages to close.
    ///
    /// Activates right away when installed; otherwise the request is kept
    /// for [`CacheWorker::start`].
    pub async fn skip_waiting(&self) -> Result<(), WorkerError> {
        self.skip_waiting.store(true, Ordering::SeqCst);

        if self.state() != WorkerState::Waiting {
            return Ok(());
        }

        match self.activate().await {
            Ok(_) => Ok(()),
            // Another caller activated in between
            Err(WorkerError::InvalidState { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    /// Install, then activate if skip-waiting was requested.
    ///
    /// Returns the partitions evicted on activation.
    pub async fn start(&self) -> Result<Vec<String>, WorkerError> {
        self.install().await?;
        self.activate_if_requested().await
    }

    async fn activate_if_requested(&self) -> Result<Vec<String>, WorkerError> {
        if !self.skip_waiting_requested() {
            return Ok(Vec::new());
        }

        match self.activate().await {
            Ok(deleted) => Ok(deleted),
            // A skipWaiting command got there first
            Err(WorkerError::InvalidState { .. }) if self.state() == WorkerState::Active => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::cache::{CacheConfig, CacheStorage};
    use crate::config::DEFAULT_STATIC_ASSETS;
    use crate::testing::{HostCall, MockFetcher, RecordingHost, TestWorker, test_config, test_worker};

    #[tokio::test]
    async fn install_caches_every_static_asset() {
        let TestWorker { worker, fetcher, .. } = test_worker("v1");

        worker.install().await.unwrap();

        assert_eq!(worker.state(), WorkerState::Waiting);
        assert!(worker.skip_waiting_requested());

        let partition = worker
            .storage()
            .get(worker.names().name(PartitionKind::Static))
            .unwrap();
        assert_eq!(partition.entry_count().await.unwrap(), DEFAULT_STATIC_ASSETS.len());
        assert_eq!(fetcher.total_calls(), DEFAULT_STATIC_ASSETS.len());
    }

    #[tokio::test]
    async fn one_failing_asset_fails_the_install() {
        let TestWorker { worker, fetcher, .. } = test_worker("v1");
        fetcher.respond("https://shop.example/icons/icon-512x512.svg", 404, "missing");

        let err = worker.install().await.unwrap_err();

        assert!(
            matches!(&err, WorkerError::InstallFailed { url, .. } if url.ends_with("icon-512x512.svg")),
            "{err}"
        );
        assert_eq!(worker.state(), WorkerState::Redundant);
        assert!(worker.storage().keys().is_empty());
    }

    #[tokio::test]
    async fn unreachable_asset_fails_the_install() {
        let TestWorker { worker, fetcher, .. } = test_worker("v1");
        fetcher.fail("https://unpkg.com/mithril/mithril.js");

        assert!(matches!(
            worker.install().await,
            Err(WorkerError::InstallFailed { .. })
        ));
        assert_eq!(worker.state(), WorkerState::Redundant);
        assert!(worker.storage().keys().is_empty());

        // A redundant worker cannot be activated
        assert!(matches!(
            worker.activate().await,
            Err(WorkerError::InvalidState { state: WorkerState::Redundant, .. })
        ));
    }

    #[tokio::test]
    async fn install_runs_once() {
        let TestWorker { worker, .. } = test_worker("v1");
        worker.install().await.unwrap();

        assert!(matches!(
            worker.install().await,
            Err(WorkerError::InvalidState { operation: "install", .. })
        ));
    }

    #[tokio::test]
    async fn activation_evicts_other_versions_only() {
        let storage = Arc::new(CacheStorage::in_memory());
        for name in ["static-v1", "images-v1", "fonts-v1", "dynamic-v1", "workbox-runtime"] {
            storage.open(name).await.unwrap();
        }

        let fetcher = Arc::new(MockFetcher::serving_static_assets());
        let host = Arc::new(RecordingHost::default());
        let worker = CacheWorker::new(test_config("v2"), storage, fetcher, host.clone());

        let mut evicted = worker.start().await.unwrap();
        evicted.sort();

        assert_eq!(evicted, vec!["dynamic-v1", "fonts-v1", "images-v1", "static-v1"]);
        assert_eq!(worker.state(), WorkerState::Active);
        assert_eq!(worker.storage().keys(), vec!["workbox-runtime", "static-v2"]);
        for name in worker.storage().keys() {
            assert!(!worker.names().is_stale(&name), "{name}");
        }
        assert_eq!(host.calls(), vec![HostCall::Claim]);
    }

    #[tokio::test]
    async fn eviction_reaches_partitions_left_on_disk() {
        let root = tempfile::tempdir().unwrap();
        let cache = CacheConfig::disk(root.path());

        for version in ["v1", "v2"] {
            let mut config = test_config(version);
            config.cache = cache.clone();
            let storage = Arc::new(CacheStorage::new(&config.cache).await.unwrap());
            let worker = CacheWorker::new(
                config,
                storage,
                Arc::new(MockFetcher::serving_static_assets()),
                Arc::new(RecordingHost::default()),
            );
            worker.start().await.unwrap();
        }

        assert!(!root.path().join("static-v1").exists());
        assert!(root.path().join("static-v2").is_dir());
    }

    #[tokio::test]
    async fn skip_waiting_activates_an_installed_worker() {
        let TestWorker { worker, host, .. } = test_worker("v1");

        // Before install it is only recorded
        worker.skip_waiting().await.unwrap();
        assert_eq!(worker.state(), WorkerState::Parsed);
        assert!(worker.skip_waiting_requested());

        worker.install().await.unwrap();
        worker.skip_waiting().await.unwrap();
        assert_eq!(worker.state(), WorkerState::Active);

        // Again once active: nothing happens
        worker.skip_waiting().await.unwrap();
        assert_eq!(host.calls(), vec![HostCall::Claim]);
    }

    #[tokio::test]
    async fn activate_requires_install() {
        let TestWorker { worker, .. } = test_worker("v1");
        assert!(matches!(
            worker.activate().await,
            Err(WorkerError::InvalidState { operation: "activate", state: WorkerState::Parsed })
        ));
    }

    #[tokio::test]
    async fn start_accepts_activation_by_a_concurrent_skip_waiting() {
        let TestWorker { worker, host, .. } = test_worker("v1");
        worker.install().await.unwrap();

        // The command channel activates before start gets to it
        worker.skip_waiting().await.unwrap();
        assert_eq!(worker.state(), WorkerState::Active);

        assert!(worker.activate_if_requested().await.unwrap().is_empty());
        assert_eq!(worker.state(), WorkerState::Active);
        assert_eq!(host.calls(), vec![HostCall::Claim]);
    }
}
