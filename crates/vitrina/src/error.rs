use crate::worker::{EventKind, WorkerState};

/// Errors produced by the offline cache engine
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Network request failed for {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Invalid JSON payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Invalid version tag: '{0}'")]
    InvalidVersion(String),

    #[error("Worker source does not contain the version placeholder {0}")]
    MissingPlaceholder(&'static str),

    #[error("Invalid partition name: '{0}'")]
    InvalidPartition(String),

    #[error("Invalid proxy configuration: {0}")]
    Proxy(String),

    #[error("Cannot {operation} while worker is {state:?}")]
    InvalidState {
        operation: &'static str,
        state: WorkerState,
    },

    #[error("Install failed while pre-caching {url}: {reason}")]
    InstallFailed { url: String, reason: String },

    #[error("No handler registered for {0} events")]
    UnhandledEvent(EventKind),
}

impl WorkerError {
    pub fn network(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Network {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}
