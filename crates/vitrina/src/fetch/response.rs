use bytes::Bytes;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

/// Body of the synthesized response served when nothing else is available
pub const OFFLINE_BODY: &str = "Content unavailable offline";

/// A complete HTTP response, buffered in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    /// Final URL after redirects, when it came from the network
    pub url: Option<String>,
}

/// Everything about a response except its body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ResponseHead {
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub url: Option<String>,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        let status_text = StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or_default()
            .to_string();

        Self {
            status,
            status_text,
            headers: Vec::new(),
            body: body.into(),
            url: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// The fixed 503 served when a request fails with no cached fallback
    pub fn offline() -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE.as_u16(), OFFLINE_BODY)
            .with_header("Content-Type", "text/plain; charset=utf-8")
    }

    /// Only exactly-200 responses are ever written to a partition
    pub fn is_cacheable(&self) -> bool {
        self.status == StatusCode::OK.as_u16()
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub(crate) fn head(&self) -> ResponseHead {
        ResponseHead {
            status: self.status,
            status_text: self.status_text.clone(),
            headers: self.headers.clone(),
            url: self.url.clone(),
        }
    }

    pub(crate) fn from_parts(head: ResponseHead, body: Bytes) -> Self {
        Self {
            status: head.status,
            status_text: head.status_text,
            headers: head.headers,
            body,
            url: head.url,
        }
    }
}
