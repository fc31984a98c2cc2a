use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::builder::WorkerConfigBuilder;
use crate::cache::CacheConfig;
use crate::proxy::ProxyConfig;
use crate::{VersionTag, WorkerError};

const DEFAULT_USER_AGENT: &str = concat!("vitrina-engine/", env!("CARGO_PKG_VERSION"));

/// Assets pre-cached into the static partition on install.
///
/// Relative entries resolve against [`WorkerConfig::scope`].
pub const DEFAULT_STATIC_ASSETS: &[&str] = &[
    "./",
    "./index.html",
    "./manifest.json",
    "./styles.css",
    "./fonts/poppins-300.woff2",
    "./fonts/poppins-400.woff2",
    "./fonts/poppins-500.woff2",
    "./fonts/poppins-600.woff2",
    "./fonts/poppins-700.woff2",
    "./icons/icon-72x72.svg",
    "./icons/icon-96x96.svg",
    "./icons/icon-128x128.svg",
    "./icons/icon-144x144.svg",
    "./icons/icon-152x152.svg",
    "./icons/icon-192x192.svg",
    "./icons/icon-512x512.svg",
    "https://cdn.jsdelivr.net/npm/lodash@4.17.21/lodash.min.js",
    "https://unpkg.com/mithril/mithril.js",
];

/// Configurable options for the network fetcher
#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    /// Overall timeout for the entire HTTP request
    pub timeout: Duration,

    /// Connection timeout (time to establish initial connection)
    pub connect_timeout: Duration,

    /// Read timeout (maximum time between receiving data chunks)
    pub read_timeout: Duration,

    /// Whether to follow redirects
    pub follow_redirects: bool,

    /// User agent string
    pub user_agent: String,

    /// Custom HTTP headers for requests
    pub headers: HeaderMap,

    /// Proxy configuration (optional)
    pub proxy: Option<ProxyConfig>,

    /// Whether to use system proxy settings if available
    pub use_system_proxy: bool,

    pub danger_accept_invalid_certs: bool,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            follow_redirects: true,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            headers: DownloaderConfig::get_default_headers(),
            proxy: None,
            use_system_proxy: true,
            danger_accept_invalid_certs: false,
        }
    }
}

impl DownloaderConfig {
    pub fn builder() -> crate::builder::DownloaderConfigBuilder {
        crate::builder::DownloaderConfigBuilder::new()
    }

    pub fn get_default_headers() -> HeaderMap {
        let mut default_headers = HeaderMap::new();

        default_headers.insert(
            reqwest::header::ACCEPT_ENCODING,
            HeaderValue::from_static("gzip, deflate"),
        );

        default_headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static("*/*"),
        );

        default_headers
    }
}

/// URL markers the router uses to classify requests.
///
/// Each list is tested with plain substring / suffix checks on the full URL
/// text, in the precedence order documented on [`crate::router::Router`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Substrings marking font resources
    pub font_markers: Vec<String>,
    /// Substrings marking image resources
    pub image_markers: Vec<String>,
    /// Suffixes of versioned stylesheets and scripts
    pub asset_suffixes: Vec<String>,
    /// Substrings naming the CDN libraries served from the static partition
    pub library_markers: Vec<String>,
    /// Suffix of HTML documents
    pub document_suffix: String,
    /// Paths of the root page
    pub root_paths: Vec<String>,
    /// Substring naming the web app manifest
    pub manifest_marker: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            font_markers: vec!["/fonts/".into(), ".woff2".into()],
            image_markers: vec!["/assets/".into(), "/icons/".into()],
            asset_suffixes: vec![".css".into(), ".js".into()],
            library_markers: vec!["lodash".into(), "mithril".into()],
            document_suffix: ".html".into(),
            root_paths: vec!["/".into(), "/index.html".into()],
            manifest_marker: "manifest.json".into(),
        }
    }
}

/// Fallback values for push notifications
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationDefaults {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub tag: String,
    pub url: String,
}

impl Default for NotificationDefaults {
    fn default() -> Self {
        Self {
            title: "Vitrina Catalog".into(),
            body: "New content available in the catalog".into(),
            icon: "./icons/icon-192x192.svg".into(),
            badge: "./icons/icon-72x72.svg".into(),
            vibrate: vec![200, 100, 200],
            tag: "catalog-update".into(),
            url: "./".into(),
        }
    }
}

/// Everything a worker instance needs, fixed for its whole lifetime
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Version of this deployment
    pub version: VersionTag,
    /// Base URL of the controlled site; relative asset paths resolve against it
    pub scope: Url,
    /// Pre-cached on install; every entry must succeed
    pub static_assets: Vec<String>,
    pub routing: RoutingConfig,
    /// Page served for failed navigations when cached
    pub fallback_page: String,
    /// Sync tag that triggers the image resync
    pub sync_tag: String,
    pub notification: NotificationDefaults,
    pub downloader: DownloaderConfig,
    pub cache: CacheConfig,
}

impl WorkerConfig {
    pub fn builder(version: VersionTag, scope: Url) -> WorkerConfigBuilder {
        WorkerConfigBuilder::new(version, scope)
    }

    /// Resolve a possibly relative path against the scope
    pub fn resolve(&self, path: &str) -> Result<Url, WorkerError> {
        self.scope.join(path).map_err(WorkerError::from)
    }

    /// The static asset list as absolute URLs, in order
    pub fn static_asset_urls(&self) -> Result<Vec<Url>, WorkerError> {
        self.static_assets
            .iter()
            .map(|asset| self.resolve(asset))
            .collect()
    }
}
