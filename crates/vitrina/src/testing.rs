//! Test doubles for the network and the host platform.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use url::Url;

use crate::cache::CacheStorage;
use crate::fetch::{Fetcher, Request, Response};
use crate::worker::{CacheWorker, ClientHost, Notification};
use crate::{VersionTag, WorkerConfig, WorkerError};

pub(crate) const SCOPE: &str = "https://shop.example/";

fn normalize(url: &str) -> String {
    Url::parse(url).map(String::from).unwrap_or_else(|_| url.to_string())
}

#[derive(Debug, Clone)]
enum MockReply {
    Respond(Response),
    Fail,
}

/// Scripted network: canned responses per URL, call counting and an
/// offline switch. Unknown URLs answer 404.
#[derive(Debug, Default)]
pub(crate) struct MockFetcher {
    replies: Mutex<HashMap<String, MockReply>>,
    calls: Mutex<HashMap<String, usize>>,
    offline: AtomicBool,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every default static asset answers 200 with body `asset <url>`
    pub fn serving_static_assets() -> Self {
        let fetcher = Self::new();
        for url in test_config("v1").static_asset_urls().unwrap() {
            fetcher.respond(url.as_str(), 200, format!("asset {url}"));
        }
        fetcher
    }

    pub fn respond(&self, url: &str, status: u16, body: impl Into<Bytes>) {
        self.replies
            .lock()
            .insert(normalize(url), MockReply::Respond(Response::new(status, body)));
    }

    /// Transport failure for one URL
    pub fn fail(&self, url: &str) {
        self.replies.lock().insert(normalize(url), MockReply::Fail);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().get(&normalize(url)).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, WorkerError> {
        let url = request.url.as_str();
        *self.calls.lock().entry(url.to_string()).or_default() += 1;

        if self.offline.load(Ordering::SeqCst) {
            return Err(WorkerError::network(url, "network is offline"));
        }

        let reply = self.replies.lock().get(url).cloned();
        match reply {
            Some(MockReply::Respond(response)) => Ok(response),
            Some(MockReply::Fail) => Err(WorkerError::network(url, "connection refused")),
            None => Ok(Response::new(404, "Not Found")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum HostCall {
    Claim,
    Show(Notification),
    Close(String),
    Open(Url),
}

/// Host that records every call
#[derive(Debug, Default)]
pub(crate) struct RecordingHost {
    calls: Mutex<Vec<HostCall>>,
}

impl RecordingHost {
    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl ClientHost for RecordingHost {
    async fn claim_clients(&self) -> Result<(), WorkerError> {
        self.calls.lock().push(HostCall::Claim);
        Ok(())
    }

    async fn show_notification(&self, notification: &Notification) -> Result<(), WorkerError> {
        self.calls.lock().push(HostCall::Show(notification.clone()));
        Ok(())
    }

    async fn close_notification(&self, tag: &str) -> Result<(), WorkerError> {
        self.calls.lock().push(HostCall::Close(tag.to_string()));
        Ok(())
    }

    async fn open_window(&self, url: &Url) -> Result<(), WorkerError> {
        self.calls.lock().push(HostCall::Open(url.clone()));
        Ok(())
    }
}

pub(crate) fn test_config(version: &str) -> WorkerConfig {
    WorkerConfig::builder(VersionTag::new(version).unwrap(), Url::parse(SCOPE).unwrap()).build()
}

pub(crate) struct TestWorker {
    pub worker: CacheWorker,
    pub fetcher: Arc<MockFetcher>,
    pub host: Arc<RecordingHost>,
}

/// In-memory worker whose network serves the default static assets
pub(crate) fn test_worker(version: &str) -> TestWorker {
    let fetcher = Arc::new(MockFetcher::serving_static_assets());
    let host = Arc::new(RecordingHost::default());
    let worker = CacheWorker::new(
        test_config(version),
        Arc::new(CacheStorage::in_memory()),
        fetcher.clone(),
        host.clone(),
    );

    TestWorker { worker, fetcher, host }
}
