//! # Vitrina Engine
//!
//! Offline cache engine for an installable catalog site. Responses are kept
//! in versioned cache partitions and served through per-resource strategies,
//! so pages keep working without a network.
//!
//! ## Features
//!
//! - Versioned partitions with eviction of previous deployments
//! - Cache-first, stale-while-revalidate and network-first strategies
//! - All-or-nothing pre-caching of the static asset list
//! - Background image resync, push notifications and a page command channel
//! - Memory or disk storage backends

pub mod builder;
pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod proxy;
pub mod router;
pub mod strategy;
pub mod version;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use builder::{DownloaderConfigBuilder, WorkerConfigBuilder};
pub use cache::{CacheBackend, CacheConfig, CacheStorage, PartitionKind, PartitionNames};
pub use config::{DEFAULT_STATIC_ASSETS, DownloaderConfig, NotificationDefaults, RoutingConfig, WorkerConfig};
pub use error::WorkerError;
pub use fetch::{Destination, Fetcher, HttpFetcher, Request, Response, create_client};
pub use proxy::{ProxyAuth, ProxyConfig, ProxyType};
pub use router::{Route, Router, Strategy};
pub use strategy::StrategyEngine;
pub use version::{VERSION_PLACEHOLDER, VersionTag, inject_version};

// Re-export the worker and its event surface
pub use worker::{
    CacheWorker, ClientHost, Command, EventKind, EventOutcome, EventTable, FetchOutcome, LoggingHost,
    Notification, NotificationData, PushPayload, WorkerEvent, WorkerState,
};
