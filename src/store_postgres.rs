#[cfg(feature = "postgres")]
use std::collections::BTreeMap;

#[cfg(feature = "postgres")]
use async_trait::async_trait;
#[cfg(feature = "postgres")]
use tokio_postgres::{Client, Row};

#[cfg(feature = "postgres")]
use crate::error::StoreError;
#[cfg(feature = "postgres")]
use crate::store::{fresh_event_id, now_secs, EventStore};
#[cfg(feature = "postgres")]
use crate::types::{EventId, NewEvent, WebhookEvent};

/// Event store backed by PostgreSQL.
#[cfg(feature = "postgres")]
pub struct PostgresEventStore {
    client: Client,
}

#[cfg(feature = "postgres")]
impl PostgresEventStore {
    pub async fn new(client: Client) -> Result<Self, tokio_postgres::Error> {
        client
            .execute(
                "CREATE TABLE IF NOT EXISTS webhook_events (
                    id TEXT PRIMARY KEY,
                    host TEXT NOT NULL,
                    path TEXT NOT NULL,
                    ip TEXT NOT NULL,
                    headers JSONB NOT NULL,
                    body JSONB NOT NULL,
                    created_at_secs BIGINT NOT NULL
                )",
                &[],
            )
            .await?;

        client
            .execute(
                "CREATE INDEX IF NOT EXISTS webhook_events_host
                 ON webhook_events (host)",
                &[],
            )
            .await?;

        Ok(Self { client })
    }

    fn row_to_event(row: &Row) -> Result<WebhookEvent, StoreError> {
        let headers: serde_json::Value = row.try_get("headers").map_err(read_failed)?;
        let headers: BTreeMap<String, String> =
            serde_json::from_value(headers).map_err(|err| StoreError::ReadFailed(err.to_string()))?;

        Ok(WebhookEvent {
            id: EventId(row.try_get("id").map_err(read_failed)?),
            host: row.try_get("host").map_err(read_failed)?,
            path: row.try_get("path").map_err(read_failed)?,
            body: row.try_get("body").map_err(read_failed)?,
            headers,
            ip: row.try_get("ip").map_err(read_failed)?,
            created_at_secs: row.try_get::<_, i64>("created_at_secs").map_err(read_failed)? as u64,
        })
    }
}

#[cfg(feature = "postgres")]
#[async_trait]
impl EventStore for PostgresEventStore {
    async fn insert(&self, event: NewEvent) -> Result<WebhookEvent, StoreError> {
        let id = fresh_event_id();
        let headers = serde_json::to_value(&event.headers)
            .map_err(|err| StoreError::WriteFailed(err.to_string()))?;

        // GREATEST keeps assigned timestamps non-decreasing per store.
        let row = self
            .client
            .query_one(
                "INSERT INTO webhook_events
                     (id, host, path, ip, headers, body, created_at_secs)
                 VALUES ($1, $2, $3, $4, $5, $6,
                     GREATEST($7, (SELECT COALESCE(MAX(created_at_secs), 0)
                                   FROM webhook_events)))
                 RETURNING created_at_secs",
                &[
                    &id.0,
                    &event.host,
                    &event.path,
                    &event.ip,
                    &headers,
                    &event.body,
                    &(now_secs() as i64),
                ],
            )
            .await
            .map_err(write_failed)?;

        let created: i64 = row.try_get(0).map_err(write_failed)?;

        Ok(WebhookEvent {
            id,
            host: event.host,
            path: event.path,
            body: event.body,
            headers: event.headers,
            ip: event.ip,
            created_at_secs: created as u64,
        })
    }

    async fn get(&self, id: &EventId) -> Result<Option<WebhookEvent>, StoreError> {
        let row = self
            .client
            .query_opt(
                "SELECT id, host, path, ip, headers, body, created_at_secs
                 FROM webhook_events WHERE id = $1",
                &[&id.0],
            )
            .await
            .map_err(read_failed)?;

        row.as_ref().map(Self::row_to_event).transpose()
    }

    async fn events_for_host(&self, host: &str) -> Result<Vec<WebhookEvent>, StoreError> {
        let rows = self
            .client
            .query(
                "SELECT id, host, path, ip, headers, body, created_at_secs
                 FROM webhook_events WHERE host = $1
                 ORDER BY created_at_secs, id",
                &[&host],
            )
            .await
            .map_err(read_failed)?;

        rows.iter().map(Self::row_to_event).collect()
    }

    async fn count_for_host(&self, host: &str) -> Result<u64, StoreError> {
        let row = self
            .client
            .query_one(
                "SELECT COUNT(*) FROM webhook_events WHERE host = $1",
                &[&host],
            )
            .await
            .map_err(read_failed)?;

        let count: i64 = row.try_get(0).map_err(read_failed)?;
        Ok(count as u64)
    }

    async fn counts_by_host(&self) -> Result<Vec<(String, u64)>, StoreError> {
        let rows = self
            .client
            .query(
                "SELECT host, COUNT(*) FROM webhook_events
                 GROUP BY host ORDER BY host",
                &[],
            )
            .await
            .map_err(read_failed)?;

        rows.iter()
            .map(|row| {
                let host: String = row.try_get(0).map_err(read_failed)?;
                let count: i64 = row.try_get(1).map_err(read_failed)?;
                Ok((host, count as u64))
            })
            .collect()
    }

    async fn delete_events(&self, host: Option<&str>) -> Result<u64, StoreError> {
        let deleted = match host {
            Some(host) => self
                .client
                .execute("DELETE FROM webhook_events WHERE host = $1", &[&host])
                .await
                .map_err(write_failed)?,
            None => self
                .client
                .execute("DELETE FROM webhook_events", &[])
                .await
                .map_err(write_failed)?,
        };
        Ok(deleted)
    }
}

#[cfg(feature = "postgres")]
fn write_failed(err: tokio_postgres::Error) -> StoreError {
    StoreError::WriteFailed(err.to_string())
}

#[cfg(feature = "postgres")]
fn read_failed(err: tokio_postgres::Error) -> StoreError {
    StoreError::ReadFailed(err.to_string())
}
