use async_trait::async_trait;
use tracing::info;
use url::Url;

use crate::WorkerError;
use crate::worker::Notification;

/// The platform hosting the worker: the pages it controls and the
/// notification tray.
#[async_trait]
pub trait ClientHost: Send + Sync {
    /// Take control of every open page without waiting for a reload
    async fn claim_clients(&self) -> Result<(), WorkerError>;

    async fn show_notification(&self, notification: &Notification) -> Result<(), WorkerError>;

    /// Close the notification shown under `tag`
    async fn close_notification(&self, tag: &str) -> Result<(), WorkerError>;

    /// Open a window at `url`, or focus one already showing it
    async fn open_window(&self, url: &Url) -> Result<(), WorkerError>;
}

/// Host that only reports what a browser would do
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingHost;

#[async_trait]
impl ClientHost for LoggingHost {
    async fn claim_clients(&self) -> Result<(), WorkerError> {
        info!("Claimed all clients");
        Ok(())
    }

    async fn show_notification(&self, notification: &Notification) -> Result<(), WorkerError> {
        info!(
            title = %notification.title,
            body = %notification.body,
            tag = %notification.tag,
            url = %notification.data.url,
            "Showing notification"
        );
        Ok(())
    }

    async fn close_notification(&self, tag: &str) -> Result<(), WorkerError> {
        info!(tag, "Closed notification");
        Ok(())
    }

    async fn open_window(&self, url: &Url) -> Result<(), WorkerError> {
        info!(%url, "Opening window");
        Ok(())
    }
}
