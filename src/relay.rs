use std::collections::BTreeMap;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::auth::{self, Capability};
use crate::error::{IngestError, QueryError, StoreError};
use crate::forward::forward_event;
use crate::routes::normalize_path;
use crate::store::{EventStore, InMemoryEventStore};
use crate::types::{
    Attachment, AuthMetadata, DeleteOutcome, ForwardTarget, NewEvent, StoreMetadata, WebhookEvent,
};

#[cfg(feature = "metrics")]
fn metric_inc(name: &'static str) {
    metrics::increment_counter!(name);
}

#[cfg(not(feature = "metrics"))]
fn metric_inc(_name: &'static str) {}

#[cfg(feature = "tracing")]
fn trace_event(message: &'static str) {
    tracing::info!(message);
}

#[cfg(not(feature = "tracing"))]
fn trace_event(_message: &'static str) {}

/// Process-wide relay configuration, loaded once at startup and never
/// mutated afterwards.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Single downstream copy target; `None` disables forwarding.
    pub forward_target: Option<ForwardTarget>,

    /// Advisory retention window surfaced through store metadata.
    pub retention_hint_secs: Option<u64>,

    /// Advisory per-tenant event quota surfaced through store metadata.
    pub event_quota: Option<u64>,

    /// Header carrying capability proof, described in the auth metadata.
    pub token_header: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            forward_target: None,
            retention_hint_secs: None,
            event_quota: None,
            token_header: "authorization".to_string(),
        }
    }
}

/// The capture pipeline: ingest, aggregate, forward.
///
/// Holds no mutable state of its own; every operation is a stateless
/// transformation over the event store.
pub struct Relay {
    store: Arc<dyn EventStore>,
    config: RelayConfig,
    auth_metadata: AuthMetadata,
    #[cfg(feature = "http")]
    http_client: reqwest::Client,
}

impl Relay {
    /// Create a relay over the in-memory store.
    pub fn new(config: RelayConfig) -> Self {
        Self::with_store(config, Arc::new(InMemoryEventStore::new()))
    }

    /// Create a relay over an explicit store backend.
    pub fn with_store(config: RelayConfig, store: Arc<dyn EventStore>) -> Self {
        let auth_metadata = auth::build_metadata(&config);
        Self {
            store,
            config,
            auth_metadata,
            #[cfg(feature = "http")]
            http_client: reqwest::Client::new(),
        }
    }

    /// Capture one inbound call.
    ///
    /// Persists the event and returns it. When a forward target is
    /// configured, a copy is dispatched on a detached task; the
    /// response never waits on the forwarding outcome.
    pub async fn ingest(
        &self,
        host: impl Into<String>,
        path: impl Into<String>,
        body: serde_json::Value,
        headers: BTreeMap<String, String>,
        ip: impl Into<String>,
        attachments: Vec<Attachment>,
    ) -> Result<WebhookEvent, IngestError> {
        let host = host.into();
        if host.is_empty() {
            return Err(IngestError::EmptyHost);
        }

        let event = self
            .store
            .insert(NewEvent {
                host,
                path: normalize_path(&path.into()),
                body: merge_attachments(body, attachments),
                headers: lowercase_headers(headers),
                ip: ip.into(),
            })
            .await
            .map_err(IngestError::Store)?;

        metric_inc("capture.ingest.stored");
        trace_event("capture.ingest.stored");

        if let Some(target) = self.config.forward_target.clone() {
            let copy = event.clone();
            #[cfg(feature = "http")]
            let client = self.http_client.clone();
            tokio::spawn(async move {
                forward_event(
                    #[cfg(feature = "http")]
                    &client,
                    &target,
                    &copy,
                )
                .await;
            });
        }

        Ok(event)
    }

    /// Live event count for one tenant.
    pub async fn count_for_host(
        &self,
        caller: &Capability,
        host: &str,
    ) -> Result<u64, QueryError> {
        auth::require_tenant_user(caller, host)?;
        Ok(self.store.count_for_host(host).await?)
    }

    /// Exact counts for every tenant with at least one event.
    pub async fn counts_by_host(
        &self,
        caller: &Capability,
    ) -> Result<Vec<(String, u64)>, QueryError> {
        auth::require_admin(caller)?;
        Ok(self.store.counts_by_host().await?)
    }

    /// Authorization scheme descriptor; requires no capability.
    pub fn auth_metadata(&self) -> AuthMetadata {
        self.auth_metadata.clone()
    }

    /// Storage configuration for one tenant.
    pub async fn store_metadata(
        &self,
        caller: &Capability,
        host: &str,
    ) -> Result<StoreMetadata, QueryError> {
        auth::require_tenant_user(caller, host)?;
        Ok(StoreMetadata {
            host: host.to_string(),
            retention_hint_secs: self.config.retention_hint_secs,
            event_quota: self.config.event_quota,
        })
    }

    /// Delete all events for `host`, or every event when `None`.
    pub async fn delete_events(&self, host: Option<&str>) -> Result<DeleteOutcome, StoreError> {
        let count = self.store.delete_events(host).await?;
        metric_inc("capture.delete.completed");
        Ok(DeleteOutcome { count })
    }

    /// Access the underlying store; the reserved internal surface reads
    /// through this.
    pub fn store(&self) -> Arc<dyn EventStore> {
        self.store.clone()
    }
}

fn lowercase_headers(headers: BTreeMap<String, String>) -> BTreeMap<String, String> {
    headers
        .into_iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), value))
        .collect()
}

/// Fold binary attachments into the stored body.
///
/// Events with attachments store `{"body": .., "attachments": [..]}` so
/// no part of the payload is silently dropped.
fn merge_attachments(body: serde_json::Value, attachments: Vec<Attachment>) -> serde_json::Value {
    if attachments.is_empty() {
        return body;
    }

    let parts: Vec<serde_json::Value> = attachments
        .iter()
        .map(|attachment| {
            serde_json::json!({
                "filename": attachment.filename,
                "content_type": attachment.content_type,
                "size": attachment.data.len(),
                "data_base64": BASE64.encode(&attachment.data),
            })
        })
        .collect();

    serde_json::json!({
        "body": body,
        "attachments": parts,
    })
}
