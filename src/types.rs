use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A captured webhook call.
///
/// Events are immutable once stored: the store assigns `id` and
/// `created_at_secs` at insert time and no field is ever updated
/// afterwards. Removal happens only through the scoped bulk delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// Store-assigned identifier, unique across all tenants.
    pub id: EventId,

    /// Tenant host the call was captured under.
    pub host: String,

    /// Capture path, always starting with a single `/`.
    pub path: String,

    /// Payload as received. Non-JSON bodies are carried as a JSON
    /// string; attachments are merged in as base64 objects.
    pub body: serde_json::Value,

    /// Request headers with lowercased names.
    pub headers: BTreeMap<String, String>,

    /// Source address as reported by the transport layer.
    pub ip: String,

    /// Unix timestamp assigned by the store, non-decreasing per store.
    pub created_at_secs: u64,
}

/// Event data handed to the store.
///
/// The store completes it into a [`WebhookEvent`] by assigning the
/// identifier and creation timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEvent {
    pub host: String,
    pub path: String,
    pub body: serde_json::Value,
    pub headers: BTreeMap<String, String>,
    pub ip: String,
}

/// Unique identifier for a captured event.
///
/// This is a strongly-typed wrapper to avoid accidental mixing
/// of event IDs with other string identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub String);

/// Binary part of an inbound call, captured alongside the body.
///
/// Attachments are never dropped: the ingestion service folds them into
/// the stored body as base64 objects.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Downstream host that receives a copy of every captured event.
///
/// Zero or one target is configured per process; absence disables
/// forwarding entirely. The value is read-only at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwardTarget {
    /// Host (authority) the copy is sent to.
    pub host: String,

    /// URL scheme used to reach the target.
    pub scheme: String,

    /// Maximum time allowed for a single forwarding attempt.
    pub timeout: Duration,

    /// Optional secret for HMAC signing of forwarded copies.
    pub secret: Option<Vec<u8>>,

    /// Signature header name.
    pub signature_header: String,

    /// Timestamp header name.
    pub timestamp_header: String,
}

impl ForwardTarget {
    /// Create a target with default forwarding settings.
    ///
    /// Defaults:
    /// - scheme: https
    /// - timeout: 5 seconds
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            scheme: "https".to_string(),
            timeout: Duration::from_secs(5),
            secret: None,
            signature_header: "X-Webhook-Signature".to_string(),
            timestamp_header: "X-Webhook-Timestamp".to_string(),
        }
    }

    /// Override the URL scheme (e.g. `http` for local targets).
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// Set a custom timeout for forwarding attempts.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set a secret for HMAC signing of forwarded copies.
    pub fn with_secret(mut self, secret: impl Into<Vec<u8>>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// Customize signature header.
    pub fn with_signature_header(mut self, header: impl Into<String>) -> Self {
        self.signature_header = header.into();
        self
    }

    /// Customize timestamp header.
    pub fn with_timestamp_header(mut self, header: impl Into<String>) -> Self {
        self.timestamp_header = header.into();
        self
    }
}

/// Describes the authorization scheme in effect.
///
/// Returned without any capability check so callers can discover how to
/// prove a level. Computed once from configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthMetadata {
    /// Authentication scheme expected by the transport layer.
    pub scheme: String,

    /// Header carrying the proof.
    pub token_header: String,

    /// Capability levels and how each is proven.
    pub levels: Vec<CapabilityDescriptor>,
}

/// One capability level of the authorization scheme.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    pub level: String,
    pub proof: String,
}

/// Per-tenant storage configuration exposed to authorized callers.
///
/// Hints only; the pipeline never enforces them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreMetadata {
    pub host: String,
    pub retention_hint_secs: Option<u64>,
    pub event_quota: Option<u64>,
}

/// Result of a bulk delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOutcome {
    /// Number of events removed.
    pub count: u64,
}
