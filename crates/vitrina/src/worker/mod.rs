//! # Cache Worker
//!
//! The long-lived state holder tying configuration, partition storage, the
//! router and the strategies together. The host delivers events either by
//! calling the handler methods directly or through [`CacheWorker::dispatch`].

mod channels;
mod events;
mod host;
mod lifecycle;

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use parking_lot::RwLock;
use tracing::{debug, warn};

pub use channels::{Command, Notification, NotificationData, PushPayload};
pub use events::{EventHandler, EventKind, EventOutcome, EventTable, WorkerEvent};
pub use host::{ClientHost, LoggingHost};

use crate::cache::{CacheKey, CacheStorage, PartitionNames};
use crate::fetch::{Destination, Fetcher, HttpFetcher, Request, Response};
use crate::router::Router;
use crate::strategy::StrategyEngine;
use crate::{WorkerConfig, WorkerError};

/// Lifecycle position of a worker instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerState {
    /// Constructed, nothing cached yet
    Parsed,
    Installing,
    /// Installed, waiting for the previous version to let go
    Waiting,
    Activating,
    Active,
    /// Install failed; this instance never serves
    Redundant,
}

/// Result of offering a request to the worker
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Not intercepted; the host performs the request itself
    Passthrough,
    Respond(Response),
}

pub struct CacheWorker {
    config: WorkerConfig,
    names: PartitionNames,
    storage: Arc<CacheStorage>,
    host: Arc<dyn ClientHost>,
    router: Router,
    engine: StrategyEngine,
    state: RwLock<WorkerState>,
    skip_waiting: AtomicBool,
    events: EventTable,
}

impl CacheWorker {
    pub fn new(
        config: WorkerConfig,
        storage: Arc<CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
        host: Arc<dyn ClientHost>,
    ) -> Self {
        let names = PartitionNames::new(&config.version);
        let engine = StrategyEngine::new(storage.clone(), fetcher, names.clone());
        let router = Router::new(config.routing.clone());

        debug!(version = %config.version, scope = %config.scope, "Worker parsed");

        Self {
            config,
            names,
            storage,
            host,
            router,
            engine,
            state: RwLock::new(WorkerState::Parsed),
            skip_waiting: AtomicBool::new(false),
            events: EventTable::standard(),
        }
    }

    /// Worker with an HTTP fetcher and the configured storage backend
    pub async fn from_config(config: WorkerConfig, host: Arc<dyn ClientHost>) -> Result<Self, WorkerError> {
        let fetcher = Arc::new(HttpFetcher::new(&config.downloader)?);
        let storage = Arc::new(CacheStorage::new(&config.cache).await?);
        Ok(Self::new(config, storage, fetcher, host))
    }

    /// Replace the event table
    pub fn with_events(mut self, events: EventTable) -> Self {
        self.events = events;
        self
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn names(&self) -> &PartitionNames {
        &self.names
    }

    pub fn storage(&self) -> &Arc<CacheStorage> {
        &self.storage
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn state(&self) -> WorkerState {
        *self.state.read()
    }

    /// Deliver an event to its registered handler
    pub async fn dispatch(&self, event: WorkerEvent) -> Result<EventOutcome, WorkerError> {
        let kind = event.kind();
        let handler = self
            .events
            .get(kind)
            .ok_or(WorkerError::UnhandledEvent(kind))?;
        handler(self, event).await
    }

    /// Route an intercepted request through its strategy.
    ///
    /// Failures never reach the page: documents fall back to the cached
    /// fallback page and everything else gets the offline response.
    pub async fn handle_fetch(&self, request: &Request) -> FetchOutcome {
        if !self.router.intercepts(request) {
            return FetchOutcome::Passthrough;
        }

        let route = self.router.classify(request);
        debug!(url = %request.url, strategy = ?route.strategy, partition = %route.partition, "Routing request");

        match self.engine.execute(route, request).await {
            Ok(response) => FetchOutcome::Respond(response),
            Err(e) => {
                warn!(url = %request.url, error = %e, "Request failed, serving fallback");
                FetchOutcome::Respond(self.fallback_for(request).await)
            }
        }
    }

    async fn fallback_for(&self, request: &Request) -> Response {
        if request.destination == Destination::Document {
            match self.cached_fallback_page().await {
                Ok(Some(page)) => return page,
                Ok(None) => debug!("Fallback page is not cached"),
                Err(e) => warn!(error = %e, "Failed to read fallback page"),
            }
        }
        Response::offline()
    }

    async fn cached_fallback_page(&self) -> Result<Option<Response>, WorkerError> {
        let url = self.config.resolve(&self.config.fallback_page)?;
        self.storage.match_request(&CacheKey::get(&url)).await
    }

    /// Wait until every detached cache refresh has finished
    pub async fn settle(&self) {
        debug!(pending = self.engine.pending_refreshes(), "Waiting for background refreshes");
        self.engine.settle().await;
    }

    pub(crate) fn engine(&self) -> &StrategyEngine {
        &self.engine
    }

    pub(crate) fn host(&self) -> &Arc<dyn ClientHost> {
        &self.host
    }
}

impl std::fmt::Debug for CacheWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheWorker")
            .field("version", &self.config.version)
            .field("state", &self.state())
            .field("storage", &self.storage)
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::OFFLINE_BODY;
    use crate::testing::{TestWorker, test_worker};
    use reqwest::Method;
    use url::Url;

    fn url(path: &str) -> Url {
        Url::parse("https://shop.example/").unwrap().join(path).unwrap()
    }

    fn body(outcome: FetchOutcome) -> Response {
        match outcome {
            FetchOutcome::Respond(response) => response,
            FetchOutcome::Passthrough => panic!("request was not intercepted"),
        }
    }

    #[tokio::test]
    async fn non_get_and_non_http_pass_through() {
        let TestWorker { worker, fetcher, .. } = test_worker("v1");

        for method in [Method::POST, Method::PUT, Method::DELETE] {
            let request = Request::new(method, url("api/order"), Destination::Empty);
            assert_eq!(worker.handle_fetch(&request).await, FetchOutcome::Passthrough);
        }

        let extension = Request::get(Url::parse("chrome-extension://abcdef/content.js").unwrap());
        assert_eq!(worker.handle_fetch(&extension).await, FetchOutcome::Passthrough);

        assert_eq!(fetcher.total_calls(), 0);
        assert!(worker.storage().keys().is_empty());
    }

    #[tokio::test]
    async fn cached_font_is_never_refetched() {
        let TestWorker { worker, fetcher, .. } = test_worker("v1");
        worker.start().await.unwrap();
        let font = url("fonts/poppins-400.woff2");
        let calls_after_install = fetcher.calls(font.as_str());

        fetcher.respond(font.as_str(), 200, "a newer font");
        let request = Request::get(font.clone()).with_destination(Destination::Font);
        for _ in 0..3 {
            let response = body(worker.handle_fetch(&request).await);
            assert_eq!(response.body, format!("asset {font}"));
        }

        assert_eq!(fetcher.calls(font.as_str()), calls_after_install);
    }

    #[tokio::test]
    async fn offline_navigation_serves_cached_root_page() {
        let TestWorker { worker, fetcher, .. } = test_worker("v1");
        worker.start().await.unwrap();
        fetcher.set_offline(true);

        let root = body(worker.handle_fetch(&Request::navigate(url("./"))).await);
        assert_eq!(root.status, 200);
        assert_eq!(root.body, format!("asset {}", url("./")));

        // An uncached page falls back to the cached shell
        let other = body(worker.handle_fetch(&Request::navigate(url("catalog/shoes"))).await);
        assert_eq!(other.status, 200);
        assert_eq!(other.body, format!("asset {}", url("index.html")));
    }

    #[tokio::test]
    async fn offline_uncached_request_gets_503() {
        let TestWorker { worker, fetcher, .. } = test_worker("v1");
        fetcher.set_offline(true);

        let response = body(worker.handle_fetch(&Request::get(url("api/products.json"))).await);
        assert_eq!(response, Response::offline());
        assert_eq!(response.body, OFFLINE_BODY);

        // A document without a cached shell degrades the same way
        let page = body(worker.handle_fetch(&Request::navigate(url("catalog"))).await);
        assert_eq!(page.status, 503);
    }

    #[tokio::test]
    async fn dynamic_requests_use_network_first() {
        let TestWorker { worker, fetcher, .. } = test_worker("v1");
        let api = url("api/products.json");
        fetcher.respond(api.as_str(), 200, "[1]");

        assert_eq!(body(worker.handle_fetch(&Request::get(api.clone())).await).body, "[1]");

        fetcher.set_offline(true);
        assert_eq!(body(worker.handle_fetch(&Request::get(api.clone())).await).body, "[1]");

        let dynamic = worker.names().name(crate::cache::PartitionKind::Dynamic);
        assert!(worker.storage().has(dynamic));
    }

    #[tokio::test]
    async fn images_revalidate_in_the_background() {
        let TestWorker { worker, fetcher, .. } = test_worker("v1");
        let image = url("assets/product-1.webp");
        fetcher.respond(image.as_str(), 200, "old pixels");
        let request = Request::get(image.clone()).with_destination(Destination::Image);

        body(worker.handle_fetch(&request).await);
        worker.settle().await;

        fetcher.respond(image.as_str(), 200, "new pixels");
        assert_eq!(body(worker.handle_fetch(&request).await).body, "old pixels");
        worker.settle().await;
        assert_eq!(body(worker.handle_fetch(&request).await).body, "new pixels");
    }
}
