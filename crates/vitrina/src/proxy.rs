use reqwest::Proxy;
use serde::{Deserialize, Serialize};

use crate::WorkerError;

/// Which traffic an outgoing proxy applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyType {
    /// Plain HTTP requests only
    Http,
    /// HTTPS requests only
    Https,
    /// SOCKS5 proxy for every request
    Socks5,
    /// Every request regardless of scheme
    #[default]
    All,
}

/// Basic credentials for the proxy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyAuth {
    pub username: String,
    pub password: String,
}

/// Proxy used by the network fetcher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Proxy server URL (e.g., "http://proxy.example.com:8080")
    pub url: String,
    #[serde(default)]
    pub proxy_type: ProxyType,
    #[serde(default)]
    pub auth: Option<ProxyAuth>,
}

/// Build a reqwest Proxy from the configuration
pub fn build_proxy_from_config(config: &ProxyConfig) -> Result<Proxy, WorkerError> {
    let proxy_url = config.url.as_str();

    let mut proxy = match config.proxy_type {
        ProxyType::Http => Proxy::http(proxy_url),
        ProxyType::Https => Proxy::https(proxy_url),
        ProxyType::Socks5 if proxy_url.starts_with("socks5://") => Proxy::all(proxy_url),
        ProxyType::Socks5 => Proxy::all(format!("socks5://{proxy_url}")),
        ProxyType::All => Proxy::all(proxy_url),
    }
    .map_err(|e| WorkerError::Proxy(format!("{:?} proxy '{proxy_url}': {e}", config.proxy_type)))?;

    if let Some(auth) = &config.auth {
        proxy = proxy.basic_auth(&auth.username, &auth.password);
    }

    Ok(proxy)
}
