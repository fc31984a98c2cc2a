//! Auxiliary channels: background resync, push notifications, notification
//! clicks and the page command channel.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use url::Url;

use crate::WorkerError;
use crate::cache::{CacheKey, PartitionKind};
use crate::config::NotificationDefaults;
use crate::worker::CacheWorker;

/// Data attached to a notification and read back on click
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationData {
    pub url: String,
}

/// A notification ready for the host to display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub tag: String,
    pub data: NotificationData,
}

/// Optional fields a push message may carry
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PushPayload {
    pub title: Option<String>,
    pub body: Option<String>,
    pub url: Option<String>,
}

impl PushPayload {
    /// Parse raw push data; absent or empty data is an empty payload
    pub fn parse(data: Option<&[u8]>) -> Result<Self, WorkerError> {
        match data {
            Some(bytes) if !bytes.iter().all(u8::is_ascii_whitespace) => {
                Ok(serde_json::from_slice(bytes)?)
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn into_notification(self, defaults: &NotificationDefaults) -> Notification {
        Notification {
            title: self.title.unwrap_or_else(|| defaults.title.clone()),
            body: self.body.unwrap_or_else(|| defaults.body.clone()),
            icon: defaults.icon.clone(),
            badge: defaults.badge.clone(),
            vibrate: defaults.vibrate.clone(),
            tag: defaults.tag.clone(),
            data: NotificationData {
                url: self.url.unwrap_or_else(|| defaults.url.clone()),
            },
        }
    }
}

/// Commands a controlled page can send
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Command {
    SkipWaiting,
    GetVersion,
    ClearCache,
}

impl CacheWorker {
    /// Re-fetch every entry of the current images partition.
    ///
    /// Best effort: failed or non-200 fetches keep the old entry. Tags other
    /// than the configured sync tag are ignored. Returns how many entries
    /// were refreshed.
    pub async fn handle_sync(&self, tag: &str) -> Result<usize, WorkerError> {
        if tag != self.config.sync_tag {
            debug!(tag, "Ignoring sync with unknown tag");
            return Ok(0);
        }

        let name = self.names.name(PartitionKind::Images);
        let Some(partition) = self.storage.get(name) else {
            debug!(partition = name, "Nothing to resync");
            return Ok(0);
        };

        let keys = partition.keys().await?;
        let fetcher = self.engine.fetcher();
        let partition = &partition;

        let refreshed = join_all(keys.into_iter().map(|key| async move {
            let Ok(request) = key.to_request() else {
                return false;
            };
            match fetcher.fetch(&request).await {
                Ok(response) if response.is_cacheable() => partition.put(key, response).await.is_ok(),
                Ok(response) => {
                    debug!(url = %request.url, status = response.status, "Resync kept cached image");
                    false
                }
                Err(e) => {
                    debug!(url = %request.url, error = %e, "Resync fetch failed");
                    false
                }
            }
        }))
        .await;

        let count = refreshed.into_iter().filter(|ok| *ok).count();
        info!(partition = name, refreshed = count, "Image resync finished");
        Ok(count)
    }

    /// Build a notification from push data and have the host show it
    pub async fn handle_push(&self, data: Option<&[u8]>) -> Result<Notification, WorkerError> {
        let notification = PushPayload::parse(data)?.into_notification(&self.config.notification);
        self.host.show_notification(&notification).await?;
        Ok(notification)
    }

    /// Close the clicked notification and open its target.
    ///
    /// Returns the absolute URL that was opened.
    pub async fn handle_notification_click(&self, notification: &Notification) -> Result<Url, WorkerError> {
        self.host.close_notification(&notification.tag).await?;

        let target = self.config.resolve(&notification.data.url)?;
        self.host.open_window(&target).await?;
        Ok(target)
    }

    /// Handle a command from a controlled page.
    ///
    /// The reply, if the command has one, is sent over `reply` and also
    /// returned. Unknown messages are ignored.
    pub async fn handle_message(
        &self,
        data: Value,
        reply: Option<oneshot::Sender<Value>>,
    ) -> Result<Option<Value>, WorkerError> {
        let command = match serde_json::from_value::<Command>(data) {
            Ok(command) => command,
            Err(e) => {
                debug!(error = %e, "Ignoring unrecognized message");
                return Ok(None);
            }
        };

        debug!(?command, "Received command");
        let response = match command {
            Command::SkipWaiting => {
                self.skip_waiting().await?;
                None
            }
            Command::GetVersion => Some(json!({
                "version": self.names.version().as_str(),
                "caches": self.names.all(),
            })),
            Command::ClearCache => {
                self.clear_all().await?;
                Some(json!({ "cleared": true }))
            }
        };

        if let (Some(value), Some(port)) = (&response, reply) {
            // The page may have stopped listening
            let _ = port.send(value.clone());
        }

        Ok(response)
    }

    /// Delete every partition, letting each delete finish before reporting.
    ///
    /// Fails with the first error when any partition could not be removed.
    async fn clear_all(&self) -> Result<(), WorkerError> {
        let names = self.storage.keys();
        let results = join_all(names.iter().map(|name| self.storage.delete(name))).await;

        let mut first_error = None;
        for (name, result) in names.iter().zip(results) {
            if let Err(e) = result {
                warn!(partition = %name, error = %e, "Failed to clear partition");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                info!(partitions = names.len(), "Cleared all partitions");
                Ok(())
            }
        }
    }

    /// Whether an entry for `url` exists in any partition
    pub async fn is_cached(&self, url: &Url) -> Result<bool, WorkerError> {
        Ok(self.storage.match_request(&CacheKey::get(url)).await?.is_some())
    }
}
