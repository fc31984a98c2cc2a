//! # Configuration Builders
//!
//! Fluent builders for [`DownloaderConfig`] and [`WorkerConfig`].
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use vitrina_engine::{DownloaderConfig, VersionTag, WorkerConfig};
//!
//! let downloader = DownloaderConfig::builder()
//!     .with_timeout(Duration::from_secs(20))
//!     .with_user_agent("VitrinaWorker/1.0")
//!     .build();
//!
//! let config = WorkerConfig::builder(
//!     VersionTag::new("v20240101").unwrap(),
//!     "https://shop.example/".parse().unwrap(),
//! )
//! .with_downloader(downloader)
//! .with_static_assets(["./", "./index.html"])
//! .build();
//!
//! assert_eq!(config.static_assets.len(), 2);
//! ```

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use url::Url;

use crate::cache::CacheConfig;
use crate::config::{DEFAULT_STATIC_ASSETS, NotificationDefaults, RoutingConfig};
use crate::proxy::ProxyConfig;
use crate::{DownloaderConfig, VersionTag, WorkerConfig};

/// Builder for creating DownloaderConfig instances with a fluent API
#[derive(Debug, Clone)]
pub struct DownloaderConfigBuilder {
    config: DownloaderConfig,
}

impl DownloaderConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: DownloaderConfig::default(),
        }
    }

    /// Set the overall timeout for the entire HTTP request
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the connection timeout (time to establish initial connection)
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set the read timeout (maximum time between receiving data chunks)
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    pub fn with_follow_redirects(mut self, follow: bool) -> Self {
        self.config.follow_redirects = follow;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Add a custom HTTP header; invalid names or values are skipped
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        if let (Ok(name), Ok(value)) = (
            name.as_ref().parse::<reqwest::header::HeaderName>(),
            HeaderValue::from_str(value.as_ref()),
        ) {
            self.config.headers.insert(name, value);
        }
        self
    }

    /// Merge headers over the defaults; custom values win
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        for (name, value) in headers.iter() {
            self.config.headers.insert(name.clone(), value.clone());
        }
        self
    }

    /// Set the proxy configuration
    pub fn with_proxy(mut self, proxy: ProxyConfig) -> Self {
        self.config.proxy = Some(proxy);
        self.config.use_system_proxy = false; // Explicit proxy overrides system proxy
        self
    }

    /// Set whether to use system proxy settings if available
    pub fn with_system_proxy(mut self, use_system_proxy: bool) -> Self {
        // Only set system proxy if no explicit proxy is configured
        if self.config.proxy.is_none() {
            self.config.use_system_proxy = use_system_proxy;
        }
        self
    }

    /// Set whether to accept invalid certificates
    ///
    /// # Warning
    /// Only for local development servers with self-signed certificates.
    pub fn danger_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.config.danger_accept_invalid_certs = accept;
        self
    }

    pub fn build(self) -> DownloaderConfig {
        self.config
    }
}

impl Default for DownloaderConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for [`WorkerConfig`]; everything except version and scope has a default
#[derive(Debug, Clone)]
pub struct WorkerConfigBuilder {
    config: WorkerConfig,
}

impl WorkerConfigBuilder {
    pub fn new(version: VersionTag, scope: Url) -> Self {
        Self {
            config: WorkerConfig {
                version,
                scope,
                static_assets: DEFAULT_STATIC_ASSETS.iter().map(|s| s.to_string()).collect(),
                routing: RoutingConfig::default(),
                fallback_page: "./index.html".to_string(),
                sync_tag: "sync-cache".to_string(),
                notification: NotificationDefaults::default(),
                downloader: DownloaderConfig::default(),
                cache: CacheConfig::default(),
            },
        }
    }

    pub fn with_static_assets<I, S>(mut self, assets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.static_assets = assets.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_routing(mut self, routing: RoutingConfig) -> Self {
        self.config.routing = routing;
        self
    }

    pub fn with_fallback_page(mut self, page: impl Into<String>) -> Self {
        self.config.fallback_page = page.into();
        self
    }

    pub fn with_sync_tag(mut self, tag: impl Into<String>) -> Self {
        self.config.sync_tag = tag.into();
        self
    }

    pub fn with_notification(mut self, notification: NotificationDefaults) -> Self {
        self.config.notification = notification;
        self
    }

    pub fn with_downloader(mut self, downloader: DownloaderConfig) -> Self {
        self.config.downloader = downloader;
        self
    }

    pub fn with_cache_config(mut self, cache: CacheConfig) -> Self {
        self.config.cache = cache;
        self
    }

    pub fn build(self) -> WorkerConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProxyAuth;
    use crate::cache::CacheBackend;

    #[test]
    fn test_builder_defaults() {
        let config = DownloaderConfigBuilder::new().build();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert!(config.follow_redirects);
        assert!(config.use_system_proxy);
        assert!(!config.danger_accept_invalid_certs);
    }

    #[test]
    fn test_builder_customization() {
        let config = DownloaderConfigBuilder::new()
            .with_timeout(Duration::from_secs(60))
            .with_connect_timeout(Duration::from_secs(20))
            .with_follow_redirects(false)
            .with_user_agent("CustomUserAgent/1.0")
            .with_header("X-Custom-Header", "CustomValue")
            .with_header("bad header", "ignored")
            .with_system_proxy(false)
            .build();

        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.connect_timeout, Duration::from_secs(20));
        assert!(!config.follow_redirects);
        assert_eq!(config.user_agent, "CustomUserAgent/1.0");
        assert!(!config.use_system_proxy);

        let header_value = config.headers.get("X-Custom-Header").unwrap();
        assert_eq!(header_value.to_str().unwrap(), "CustomValue");
        assert!(config.headers.get("bad header").is_none());
    }

    #[test]
    fn test_proxy_disables_system_proxy() {
        let config = DownloaderConfigBuilder::new()
            .with_proxy(ProxyConfig {
                url: "http://proxy.example.com:8080".to_string(),
                proxy_type: crate::ProxyType::Http,
                auth: Some(ProxyAuth {
                    username: "user".to_string(),
                    password: "pass".to_string(),
                }),
            })
            .with_system_proxy(true)
            .build();

        assert!(!config.use_system_proxy);
        assert_eq!(config.proxy.unwrap().auth.unwrap().username, "user");
    }

    #[test]
    fn test_worker_builder() {
        let config = WorkerConfigBuilder::new(
            VersionTag::new("v3").unwrap(),
            Url::parse("http://localhost:3000/").unwrap(),
        )
        .with_static_assets(["./index.html"])
        .with_sync_tag("refresh-images")
        .with_fallback_page("./offline.html")
        .with_cache_config(CacheConfig::disk("/tmp/vitrina-test"))
        .build();

        assert_eq!(config.static_assets, vec!["./index.html".to_string()]);
        assert_eq!(config.sync_tag, "refresh-images");
        assert_eq!(config.fallback_page, "./offline.html");
        assert_eq!(config.cache.backend, CacheBackend::Disk);
    }
}
