//! Explicit dispatch table from event kind to handler.
//!
//! Each handler receives the structured event value and the worker it runs
//! on; nothing is looked up from ambient state.

use std::collections::HashMap;
use std::fmt;

use bytes::Bytes;
use futures::future::BoxFuture;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::WorkerError;
use crate::fetch::{Request, Response};
use crate::worker::{CacheWorker, FetchOutcome, Notification};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Install,
    Activate,
    Fetch,
    Sync,
    Push,
    NotificationClick,
    Message,
}

impl EventKind {
    pub const ALL: [EventKind; 7] = [
        Self::Install,
        Self::Activate,
        Self::Fetch,
        Self::Sync,
        Self::Push,
        Self::NotificationClick,
        Self::Message,
    ];
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Install => "install",
            Self::Activate => "activate",
            Self::Fetch => "fetch",
            Self::Sync => "sync",
            Self::Push => "push",
            Self::NotificationClick => "notificationclick",
            Self::Message => "message",
        };
        f.write_str(name)
    }
}

/// An event delivered to the worker by its host
#[derive(Debug)]
pub enum WorkerEvent {
    Install,
    Activate,
    Fetch(Request),
    Sync { tag: String },
    Push { data: Option<Bytes> },
    NotificationClick(Notification),
    Message {
        data: Value,
        reply: Option<oneshot::Sender<Value>>,
    },
}

impl WorkerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Install => EventKind::Install,
            Self::Activate => EventKind::Activate,
            Self::Fetch(_) => EventKind::Fetch,
            Self::Sync { .. } => EventKind::Sync,
            Self::Push { .. } => EventKind::Push,
            Self::NotificationClick(_) => EventKind::NotificationClick,
            Self::Message { .. } => EventKind::Message,
        }
    }
}

/// What a handler produced
#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    Done,
    Respond(Response),
    /// The request was not intercepted; the host fetches it itself
    Passthrough,
    /// Reply sent back over the message port
    Replied(Value),
}

pub type EventHandler =
    for<'a> fn(&'a CacheWorker, WorkerEvent) -> BoxFuture<'a, Result<EventOutcome, WorkerError>>;

#[derive(Clone, Default)]
pub struct EventTable {
    handlers: HashMap<EventKind, EventHandler>,
}

impl EventTable {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with a handler for every event kind
    pub fn standard() -> Self {
        let mut table = Self::new();
        table.register(EventKind::Install, on_install);
        table.register(EventKind::Activate, on_activate);
        table.register(EventKind::Fetch, on_fetch);
        table.register(EventKind::Sync, on_sync);
        table.register(EventKind::Push, on_push);
        table.register(EventKind::NotificationClick, on_notification_click);
        table.register(EventKind::Message, on_message);
        table
    }

    /// Register a handler, replacing any previous one for the kind
    pub fn register(&mut self, kind: EventKind, handler: EventHandler) -> &mut Self {
        self.handlers.insert(kind, handler);
        self
    }

    pub fn get(&self, kind: EventKind) -> Option<EventHandler> {
        self.handlers.get(&kind).copied()
    }

    pub fn contains(&self, kind: EventKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for EventTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<String> = self.handlers.keys().map(ToString::to_string).collect();
        kinds.sort();
        f.debug_struct("EventTable").field("kinds", &kinds).finish()
    }
}

fn mismatched<'a>(kind: EventKind) -> BoxFuture<'a, Result<EventOutcome, WorkerError>> {
    Box::pin(async move { Err(WorkerError::UnhandledEvent(kind)) })
}

fn on_install(worker: &CacheWorker, _event: WorkerEvent) -> BoxFuture<'_, Result<EventOutcome, WorkerError>> {
    Box::pin(async move {
        worker.install().await?;
        if worker.skip_waiting_requested() {
            worker.activate().await?;
        }
        Ok(EventOutcome::Done)
    })
}

fn on_activate(worker: &CacheWorker, _event: WorkerEvent) -> BoxFuture<'_, Result<EventOutcome, WorkerError>> {
    Box::pin(async move {
        worker.activate().await?;
        Ok(EventOutcome::Done)
    })
}

fn on_fetch(worker: &CacheWorker, event: WorkerEvent) -> BoxFuture<'_, Result<EventOutcome, WorkerError>> {
    let kind = event.kind();
    let WorkerEvent::Fetch(request) = event else {
        return mismatched(kind);
    };
    Box::pin(async move {
        Ok(match worker.handle_fetch(&request).await {
            FetchOutcome::Respond(response) => EventOutcome::Respond(response),
            FetchOutcome::Passthrough => EventOutcome::Passthrough,
        })
    })
}

fn on_sync(worker: &CacheWorker, event: WorkerEvent) -> BoxFuture<'_, Result<EventOutcome, WorkerError>> {
    let kind = event.kind();
    let WorkerEvent::Sync { tag } = event else {
        return mismatched(kind);
    };
    Box::pin(async move {
        worker.handle_sync(&tag).await?;
        Ok(EventOutcome::Done)
    })
}

fn on_push(worker: &CacheWorker, event: WorkerEvent) -> BoxFuture<'_, Result<EventOutcome, WorkerError>> {
    let kind = event.kind();
    let WorkerEvent::Push { data } = event else {
        return mismatched(kind);
    };
    Box::pin(async move {
        worker.handle_push(data.as_deref()).await?;
        Ok(EventOutcome::Done)
    })
}

fn on_notification_click(
    worker: &CacheWorker,
    event: WorkerEvent,
) -> BoxFuture<'_, Result<EventOutcome, WorkerError>> {
    let kind = event.kind();
    let WorkerEvent::NotificationClick(notification) = event else {
        return mismatched(kind);
    };
    Box::pin(async move {
        worker.handle_notification_click(&notification).await?;
        Ok(EventOutcome::Done)
    })
}

fn on_message(worker: &CacheWorker, event: WorkerEvent) -> BoxFuture<'_, Result<EventOutcome, WorkerError>> {
    let kind = event.kind();
    let WorkerEvent::Message { data, reply } = event else {
        return mismatched(kind);
    };
    Box::pin(async move {
        Ok(match worker.handle_message(data, reply).await? {
            Some(value) => EventOutcome::Replied(value),
            None => EventOutcome::Done,
        })
    })
}
