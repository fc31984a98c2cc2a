use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use dirs::{cache_dir, config_dir};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;
use vitrina_engine::{
    CacheConfig, DEFAULT_STATIC_ASSETS, DownloaderConfig, NotificationDefaults, ProxyConfig, RoutingConfig,
    VersionTag, WorkerConfig,
};

use crate::error::AppError;

/// Network settings for the worker's fetcher
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Overall request timeout in seconds
    pub timeout: u64,
    pub connect_timeout: u64,
    pub read_timeout: u64,
    pub user_agent: Option<String>,
    /// Extra headers in "Name: Value" form
    pub headers: Vec<String>,
    pub proxy: Option<ProxyConfig>,
    pub use_system_proxy: bool,
    pub accept_invalid_certs: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout: 30,
            connect_timeout: 10,
            read_timeout: 30,
            user_agent: None,
            headers: Vec::new(),
            proxy: None,
            use_system_proxy: true,
            accept_invalid_certs: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Cache version the worker runs as
    pub version: Option<String>,

    /// Base URL of the site the worker controls
    pub scope: String,

    /// Directory holding the cache partitions
    pub cache_dir: Option<PathBuf>,

    /// Assets pre-cached on install
    pub static_assets: Vec<String>,

    /// Page served for failed navigations
    pub fallback_page: String,

    /// Sync tag that triggers the image resync
    pub sync_tag: String,

    pub network: NetworkConfig,
    pub routing: RoutingConfig,
    pub notification: NotificationDefaults,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: None,
            scope: "http://localhost:8080/".to_string(),
            cache_dir: None,
            static_assets: DEFAULT_STATIC_ASSETS.iter().map(|s| s.to_string()).collect(),
            fallback_page: "./index.html".to_string(),
            sync_tag: "sync-cache".to_string(),
            network: NetworkConfig::default(),
            routing: RoutingConfig::default(),
            notification: NotificationDefaults::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the config file and the environment
    pub fn load(config_path: Option<&Path>) -> Result<Self, AppError> {
        let mut builder = Config::builder().add_source(Config::try_from(&AppConfig::default())?);

        match config_path {
            // An explicit path must exist
            Some(path) => builder = builder.add_source(File::from(path)),
            None => {
                if let Some(default_path) = Self::default_config_path() {
                    if default_path.exists() {
                        builder = builder.add_source(File::from(default_path));
                    }
                }
            }
        }

        // VITRINA_SCOPE, VITRINA_NETWORK__TIMEOUT, ...
        builder = builder.add_source(
            Environment::with_prefix("VITRINA")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Get default configuration file path
    pub fn default_config_path() -> Option<PathBuf> {
        config_dir().map(|dir| dir.join("vitrina").join("config.toml"))
    }

    /// Show current configuration as a formatted string
    pub fn show(&self) -> Result<String, AppError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn cache_root(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .or_else(|| cache_dir().map(|dir| dir.join("vitrina")))
            .unwrap_or_else(|| std::env::temp_dir().join("vitrina-cache"))
    }

    pub fn downloader_config(&self) -> DownloaderConfig {
        let network = &self.network;
        let mut builder = DownloaderConfig::builder()
            .with_timeout(Duration::from_secs(network.timeout))
            .with_connect_timeout(Duration::from_secs(network.connect_timeout))
            .with_read_timeout(Duration::from_secs(network.read_timeout))
            .with_headers(parse_headers(&network.headers))
            .with_system_proxy(network.use_system_proxy)
            .danger_accept_invalid_certs(network.accept_invalid_certs);

        if let Some(user_agent) = &network.user_agent {
            builder = builder.with_user_agent(user_agent);
        }
        if let Some(proxy) = &network.proxy {
            builder = builder.with_proxy(proxy.clone());
        }

        builder.build()
    }

    /// Build the engine configuration, with `version` overriding the configured one
    pub fn to_worker_config(&self, version: Option<&str>) -> Result<WorkerConfig, AppError> {
        let version = version.or(self.version.as_deref()).ok_or_else(|| {
            AppError::invalid_input("no cache version configured; set `version` or pass --cache-version")
        })?;
        let scope = Url::parse(&self.scope)?;

        Ok(WorkerConfig::builder(VersionTag::new(version)?, scope)
            .with_static_assets(self.static_assets.iter().cloned())
            .with_routing(self.routing.clone())
            .with_fallback_page(self.fallback_page.clone())
            .with_sync_tag(self.sync_tag.clone())
            .with_notification(self.notification.clone())
            .with_downloader(self.downloader_config())
            .with_cache_config(CacheConfig::disk(self.cache_root()))
            .build())
    }
}

/// Parse "Name: Value" header strings, skipping malformed ones
pub fn parse_headers(header_strings: &[String]) -> HeaderMap {
    let mut headers = HeaderMap::new();

    for header_str in header_strings {
        let Some((name, value)) = header_str.split_once(':') else {
            warn!(header = %header_str, "Invalid header format, expected 'Name: Value'");
            continue;
        };
        let (name, value) = (name.trim(), value.trim());

        match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => warn!(header = %header_str, "Skipping invalid header"),
        }
    }

    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_survive_a_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
version = "v20240501"
scope = "https://shop.example/catalog/"

[network]
timeout = 5

[routing]
library_markers = ["htmx"]
"#,
        )
        .unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();

        assert_eq!(config.version.as_deref(), Some("v20240501"));
        assert_eq!(config.network.timeout, 5);
        assert_eq!(config.network.connect_timeout, 10);
        assert_eq!(config.routing.library_markers, vec!["htmx".to_string()]);
        assert_eq!(config.routing.manifest_marker, "manifest.json");
        assert_eq!(config.static_assets.len(), DEFAULT_STATIC_ASSETS.len());
        assert_eq!(config.sync_tag, "sync-cache");
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            AppConfig::load(Some(&dir.path().join("absent.toml"))),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn worker_config_requires_a_version() {
        let config = AppConfig::default();
        assert!(matches!(
            config.to_worker_config(None),
            Err(AppError::InvalidInput(_))
        ));

        let worker = config.to_worker_config(Some("v3")).unwrap();
        assert_eq!(worker.version.as_str(), "v3");
        assert_eq!(worker.fallback_page, "./index.html");
        assert_eq!(worker.cache.disk_root(), config.cache_root());
    }

    #[test]
    fn invalid_version_is_rejected() {
        let config = AppConfig {
            version: Some("../escape".into()),
            ..Default::default()
        };
        assert!(matches!(config.to_worker_config(None), Err(AppError::Worker(_))));
    }

    #[test]
    fn show_renders_toml() {
        let rendered = AppConfig::default().show().unwrap();
        assert!(rendered.contains("scope = \"http://localhost:8080/\""));
        assert!(rendered.contains("[network]"));
    }

    #[test]
    fn header_parsing_skips_bad_entries() {
        let headers = parse_headers(&[
            "Referer: https://shop.example/".to_string(),
            "no-colon".to_string(),
            "X-Trace:  abc ".to_string(),
        ]);

        assert_eq!(headers.len(), 2);
        assert_eq!(headers["referer"], "https://shop.example/");
        assert_eq!(headers["x-trace"], "abc");
    }
}
