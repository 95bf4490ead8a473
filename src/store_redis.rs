#[cfg(feature = "redis")]
use async_trait::async_trait;
#[cfg(feature = "redis")]
use redis::AsyncCommands;

#[cfg(feature = "redis")]
use crate::error::StoreError;
#[cfg(feature = "redis")]
use crate::store::{fresh_event_id, now_secs, EventStore};
#[cfg(feature = "redis")]
use crate::types::{EventId, NewEvent, WebhookEvent};

/// Event store backed by Redis.
///
/// Layout: one hash of id to serialized event, one id list per host,
/// and a set of known hosts.
#[cfg(feature = "redis")]
pub struct RedisEventStore {
    client: redis::Client,
    prefix: String,
}

#[cfg(feature = "redis")]
impl RedisEventStore {
    pub fn new(client: redis::Client, prefix: impl Into<String>) -> Self {
        Self {
            client,
            prefix: prefix.into(),
        }
    }

    fn events_key(&self) -> String {
        format!("{}:events", self.prefix)
    }

    fn hosts_key(&self) -> String {
        format!("{}:hosts", self.prefix)
    }

    fn host_key(&self, host: &str) -> String {
        format!("{}:host:{}", self.prefix, host)
    }

    fn last_ts_key(&self) -> String {
        format!("{}:last_ts", self.prefix)
    }

    async fn conn(&self) -> Result<redis::aio::Connection, redis::RedisError> {
        self.client.get_tokio_connection().await
    }
}

#[cfg(feature = "redis")]
#[async_trait]
impl EventStore for RedisEventStore {
    async fn insert(&self, event: NewEvent) -> Result<WebhookEvent, StoreError> {
        let mut conn = self.conn().await.map_err(write_failed)?;

        let last: Option<u64> = conn.get(self.last_ts_key()).await.map_err(write_failed)?;
        let created = now_secs().max(last.unwrap_or(0));

        let stored = WebhookEvent {
            id: fresh_event_id(),
            host: event.host,
            path: event.path,
            body: event.body,
            headers: event.headers,
            ip: event.ip,
            created_at_secs: created,
        };
        let payload = serde_json::to_string(&stored)
            .map_err(|err| StoreError::WriteFailed(err.to_string()))?;

        // Single MULTI block: the event is fully visible or absent.
        redis::pipe()
            .atomic()
            .hset(self.events_key(), &stored.id.0, payload)
            .ignore()
            .rpush(self.host_key(&stored.host), &stored.id.0)
            .ignore()
            .sadd(self.hosts_key(), &stored.host)
            .ignore()
            .set(self.last_ts_key(), created)
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(write_failed)?;

        Ok(stored)
    }

    async fn get(&self, id: &EventId) -> Result<Option<WebhookEvent>, StoreError> {
        let mut conn = self.conn().await.map_err(read_failed)?;
        let payload: Option<String> = conn
            .hget(self.events_key(), &id.0)
            .await
            .map_err(read_failed)?;

        match payload {
            Some(payload) => serde_json::from_str(&payload).map(Some).map_err(decode_failed),
            None => Ok(None),
        }
    }

    async fn events_for_host(&self, host: &str) -> Result<Vec<WebhookEvent>, StoreError> {
        let mut conn = self.conn().await.map_err(read_failed)?;
        let ids: Vec<String> = conn
            .lrange(self.host_key(host), 0, -1)
            .await
            .map_err(read_failed)?;

        let mut events = Vec::with_capacity(ids.len());
        for id in ids {
            let payload: Option<String> = conn
                .hget(self.events_key(), &id)
                .await
                .map_err(read_failed)?;
            if let Some(payload) = payload {
                events.push(serde_json::from_str(&payload).map_err(decode_failed)?);
            }
        }
        Ok(events)
    }

    async fn count_for_host(&self, host: &str) -> Result<u64, StoreError> {
        let mut conn = self.conn().await.map_err(read_failed)?;
        let count: u64 = conn.llen(self.host_key(host)).await.map_err(read_failed)?;
        Ok(count)
    }

    async fn counts_by_host(&self) -> Result<Vec<(String, u64)>, StoreError> {
        let mut conn = self.conn().await.map_err(read_failed)?;
        let mut hosts: Vec<String> = conn.smembers(self.hosts_key()).await.map_err(read_failed)?;
        hosts.sort();

        let mut counts = Vec::with_capacity(hosts.len());
        for host in hosts {
            let count: u64 = conn.llen(self.host_key(&host)).await.map_err(read_failed)?;
            if count > 0 {
                counts.push((host, count));
            }
        }
        Ok(counts)
    }

    async fn delete_events(&self, host: Option<&str>) -> Result<u64, StoreError> {
        let mut conn = self.conn().await.map_err(write_failed)?;

        match host {
            Some(host) => {
                let ids: Vec<String> = conn
                    .lrange(self.host_key(host), 0, -1)
                    .await
                    .map_err(write_failed)?;

                let mut pipe = redis::pipe();
                pipe.atomic();
                for id in &ids {
                    pipe.hdel(self.events_key(), id).ignore();
                }
                pipe.del(self.host_key(host)).ignore();
                pipe.srem(self.hosts_key(), host).ignore();
                pipe.query_async::<_, ()>(&mut conn)
                    .await
                    .map_err(write_failed)?;

                Ok(ids.len() as u64)
            }
            None => {
                let hosts: Vec<String> =
                    conn.smembers(self.hosts_key()).await.map_err(write_failed)?;
                let count: u64 = conn.hlen(self.events_key()).await.map_err(write_failed)?;

                let mut pipe = redis::pipe();
                pipe.atomic();
                pipe.del(self.events_key()).ignore();
                for host in &hosts {
                    pipe.del(self.host_key(host)).ignore();
                }
                pipe.del(self.hosts_key()).ignore();
                pipe.query_async::<_, ()>(&mut conn)
                    .await
                    .map_err(write_failed)?;

                Ok(count)
            }
        }
    }
}

#[cfg(feature = "redis")]
fn write_failed(err: redis::RedisError) -> StoreError {
    StoreError::WriteFailed(err.to_string())
}

#[cfg(feature = "redis")]
fn read_failed(err: redis::RedisError) -> StoreError {
    StoreError::ReadFailed(err.to_string())
}

#[cfg(feature = "redis")]
fn decode_failed(err: serde_json::Error) -> StoreError {
    StoreError::ReadFailed(err.to_string())
}
