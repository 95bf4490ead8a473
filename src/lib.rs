//! A multi-tenant webhook capture relay.
//!
//! This crate provides the **ingestion-aggregation-forwarding** core of
//! a webhook store: arbitrary inbound calls are captured as immutable
//! events under the host they arrived on, per-tenant aggregates are
//! computed live from the event log, and an optional downstream target
//! receives a best-effort copy of every event.
//!
//! ## Guarantees
//! - Atomic, exactly-once persistence per captured event
//! - Live per-tenant counts and cross-tenant grouped counts
//! - Capability checks run before any guarded query
//! - Forwarding is dispatched out-of-band and never delays the
//!   caller's response
//!
//! ## Non-Guarantees
//! - Exactly-once forwarding delivery (one attempt, best-effort)
//! - Payload schema validation
//! - Retention or quota enforcement (hints only)
//! - Rate limiting
//!
//! Tenants are implicit: any non-empty host creates one on first use.
//! The transport layer stays outside the core; the optional `server`
//! feature ships a thin axum surface over the same boundary.

mod auth;
mod error;
mod forward;
mod relay;
mod routes;
mod signing;
mod store;
mod types;

#[cfg(feature = "redis")]
mod store_redis;

#[cfg(feature = "postgres")]
mod store_postgres;

#[cfg(feature = "server")]
pub mod http;

pub use auth::{require_admin, require_tenant_user, Capability};
pub use error::{
    AuthError,
    ForwardFailure,
    ForwardOutcome,
    IngestError,
    QueryError,
    StoreError,
};
pub use forward::{forward_event, EVENT_ID_HEADER, ORIGIN_HOST_HEADER};
pub use relay::{Relay, RelayConfig};
pub use routes::{normalize_path, resolve, RouteDecision, RESERVED_PATH};
pub use signing::{build_signature_headers, compute_signature, SignatureHeaders};
pub use store::{EventStore, InMemoryEventStore};
pub use types::{
    Attachment, AuthMetadata, CapabilityDescriptor, DeleteOutcome, EventId, ForwardTarget,
    NewEvent, StoreMetadata, WebhookEvent,
};

#[cfg(feature = "redis")]
pub use store_redis::RedisEventStore;

#[cfg(feature = "postgres")]
pub use store_postgres::PostgresEventStore;
