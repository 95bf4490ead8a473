use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::types::{EventId, NewEvent, WebhookEvent};

/// Durable record of captured webhooks, keyed by identifier and
/// queryable by tenant host.
///
/// The log is append-only: `insert` is the only mutation besides the
/// scoped bulk delete, and no event is ever updated after creation.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Persist a new event, assigning its identifier and timestamp.
    ///
    /// The write is atomic: either the full event is visible to
    /// subsequent reads or nothing is stored.
    async fn insert(&self, event: NewEvent) -> Result<WebhookEvent, StoreError>;

    /// Fetch one event by identifier.
    async fn get(&self, id: &EventId) -> Result<Option<WebhookEvent>, StoreError>;

    /// All events captured under a host, oldest first.
    async fn events_for_host(&self, host: &str) -> Result<Vec<WebhookEvent>, StoreError>;

    /// Live number of events captured under a host.
    async fn count_for_host(&self, host: &str) -> Result<u64, StoreError>;

    /// Exact counts for every host with at least one event, sorted by
    /// host.
    async fn counts_by_host(&self) -> Result<Vec<(String, u64)>, StoreError>;

    /// Remove all events for `host`, or every event when `host` is
    /// `None`. Returns the number removed.
    async fn delete_events(&self, host: Option<&str>) -> Result<u64, StoreError>;
}

/// In-memory store for lightweight deployments and tests.
#[derive(Default)]
pub struct InMemoryEventStore {
    inner: Mutex<StoreInner>,
}

#[derive(Default)]
struct StoreInner {
    events: Vec<WebhookEvent>,
    last_created_secs: u64,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn insert(&self, event: NewEvent) -> Result<WebhookEvent, StoreError> {
        let mut inner = self.inner.lock().await;

        // Creation timestamps never go backwards, even if the clock does.
        let created = now_secs().max(inner.last_created_secs);
        inner.last_created_secs = created;

        let stored = WebhookEvent {
            id: fresh_event_id(),
            host: event.host,
            path: event.path,
            body: event.body,
            headers: event.headers,
            ip: event.ip,
            created_at_secs: created,
        };
        inner.events.push(stored.clone());
        Ok(stored)
    }

    async fn get(&self, id: &EventId) -> Result<Option<WebhookEvent>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.events.iter().find(|e| &e.id == id).cloned())
    }

    async fn events_for_host(&self, host: &str) -> Result<Vec<WebhookEvent>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .events
            .iter()
            .filter(|e| e.host == host)
            .cloned()
            .collect())
    }

    async fn count_for_host(&self, host: &str) -> Result<u64, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.events.iter().filter(|e| e.host == host).count() as u64)
    }

    async fn counts_by_host(&self) -> Result<Vec<(String, u64)>, StoreError> {
        let inner = self.inner.lock().await;
        let mut counts: BTreeMap<String, u64> = BTreeMap::new();
        for event in &inner.events {
            *counts.entry(event.host.clone()).or_insert(0) += 1;
        }
        Ok(counts.into_iter().collect())
    }

    async fn delete_events(&self, host: Option<&str>) -> Result<u64, StoreError> {
        let mut inner = self.inner.lock().await;
        let before = inner.events.len();
        match host {
            Some(host) => inner.events.retain(|e| e.host != host),
            None => inner.events.clear(),
        }
        Ok((before - inner.events.len()) as u64)
    }
}

/// Mint a store-assigned event identifier.
pub(crate) fn fresh_event_id() -> EventId {
    EventId(uuid::Uuid::new_v4().to_string())
}

/// Unix timestamp used for store-assigned creation times.
pub(crate) fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
