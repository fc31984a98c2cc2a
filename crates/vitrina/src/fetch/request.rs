use reqwest::Method;
use serde::{Deserialize, Serialize};
use url::Url;

/// What the page intends to do with a response, as reported by the browser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    Document,
    Image,
    Script,
    Style,
    Font,
    Manifest,
    /// `fetch()` / XHR and anything the browser does not label
    #[default]
    Empty,
}

impl std::str::FromStr for Destination {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "document" => Ok(Self::Document),
            "image" => Ok(Self::Image),
            "script" => Ok(Self::Script),
            "style" => Ok(Self::Style),
            "font" => Ok(Self::Font),
            "manifest" => Ok(Self::Manifest),
            "" | "empty" => Ok(Self::Empty),
            other => Err(format!("unknown request destination '{other}'")),
        }
    }
}

/// A request issued by a controlled page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub url: Url,
    pub method: Method,
    pub destination: Destination,
}

impl Request {
    pub fn new(method: Method, url: Url, destination: Destination) -> Self {
        Self {
            url,
            method,
            destination,
        }
    }

    /// Plain GET with no destination, as issued by `fetch()`
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url, Destination::Empty)
    }

    /// Top-level navigation
    pub fn navigate(url: Url) -> Self {
        Self::new(Method::GET, url, Destination::Document)
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn is_http(&self) -> bool {
        matches!(self.url.scheme(), "http" | "https")
    }

    pub fn is_get(&self) -> bool {
        self.method == Method::GET
    }
}
