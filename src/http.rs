//! Thin HTTP transport over the relay.
//!
//! Every POST on every path is a capture unless it resolves to the
//! reserved internal path; the aggregate and metadata queries live on
//! fixed routes. Body parsing and token verification stay here,
//! outside the pipeline core.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{ConnectInfo, State};
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get};
use axum::{Json, Router};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;

use crate::auth::Capability;
use crate::error::{IngestError, QueryError};
use crate::relay::Relay;
use crate::routes::{resolve, RouteDecision};

/// Token-based capability verification for the HTTP layer.
///
/// The pipeline core only ever sees the proven [`Capability`]; how a
/// bearer token maps to one is decided here.
#[derive(Debug, Clone, Default)]
pub struct TokenConfig {
    /// Bearer token granting the administrator capability.
    pub admin_token: Option<String>,

    /// Secret from which per-host tenant tokens are derived.
    pub tenant_secret: Option<Vec<u8>>,
}

#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<Relay>,
    pub tokens: TokenConfig,
}

/// Build the capture router.
///
/// Fixed routes serve the query surface; everything else falls through
/// to capture, including POSTs that collide with a fixed route's path.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/count-webhooks", get(count_webhooks))
        .route("/webhooks-per-host", get(webhooks_per_host))
        .route("/auth-metadata", get(auth_metadata))
        .route("/store-metadata", get(store_metadata))
        .route("/", delete(delete_webhooks))
        .fallback(capture_any)
        .method_not_allowed_fallback(capture_any)
        .with_state(state)
}

/// Derive the bearer token that proves tenant-user capability for a
/// host.
pub fn tenant_token(secret: &[u8], host: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret)
        .unwrap_or_else(|_| Hmac::<Sha256>::new_from_slice(b"default").expect("hmac"));
    mac.update(host.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

async fn capture_any(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if method != Method::POST {
        return StatusCode::NOT_FOUND.into_response();
    }

    let Some(host) = request_host(&headers) else {
        return error_response(StatusCode::BAD_REQUEST, "missing_host", "Host header is required");
    };

    match resolve(uri.path()) {
        // The reserved surface is mounted by the embedding deployment,
        // not by this router.
        RouteDecision::Reserved => StatusCode::NOT_FOUND.into_response(),
        RouteDecision::Capture(path) => {
            let outcome = state
                .relay
                .ingest(
                    host,
                    path,
                    parse_body(&body),
                    header_btree(&headers),
                    client_ip(&headers, addr),
                    Vec::new(),
                )
                .await;

            match outcome {
                Ok(event) => Json(event).into_response(),
                Err(IngestError::EmptyHost) => error_response(
                    StatusCode::BAD_REQUEST,
                    "missing_host",
                    "tenant host must not be empty",
                ),
                Err(IngestError::Store(err)) => error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "storage_failure",
                    &err.to_string(),
                ),
            }
        }
    }
}

async fn count_webhooks(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(host) = request_host(&headers) else {
        return error_response(StatusCode::BAD_REQUEST, "missing_host", "Host header is required");
    };
    let Some(caller) = capability_from_headers(&state.tokens, &headers, &host) else {
        return unauthorized();
    };

    match state.relay.count_for_host(&caller, &host).await {
        Ok(count) => Json(count).into_response(),
        Err(err) => query_error_response(err),
    }
}

#[derive(Serialize)]
struct HostCount {
    host: String,
    count: u64,
}

async fn webhooks_per_host(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(host) = request_host(&headers) else {
        return error_response(StatusCode::BAD_REQUEST, "missing_host", "Host header is required");
    };
    let Some(caller) = capability_from_headers(&state.tokens, &headers, &host) else {
        return unauthorized();
    };

    match state.relay.counts_by_host(&caller).await {
        Ok(counts) => {
            let counts: Vec<HostCount> = counts
                .into_iter()
                .map(|(host, count)| HostCount { host, count })
                .collect();
            Json(counts).into_response()
        }
        Err(err) => query_error_response(err),
    }
}

async fn auth_metadata(State(state): State<AppState>) -> Response {
    Json(state.relay.auth_metadata()).into_response()
}

async fn store_metadata(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(host) = request_host(&headers) else {
        return error_response(StatusCode::BAD_REQUEST, "missing_host", "Host header is required");
    };
    let Some(caller) = capability_from_headers(&state.tokens, &headers, &host) else {
        return unauthorized();
    };

    match state.relay.store_metadata(&caller, &host).await {
        Ok(metadata) => Json(metadata).into_response(),
        Err(err) => query_error_response(err),
    }
}

async fn delete_webhooks(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(host) = request_host(&headers) else {
        return error_response(StatusCode::BAD_REQUEST, "missing_host", "Host header is required");
    };

    match state.relay.delete_events(Some(&host)).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(err) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "storage_failure",
            &err.to_string(),
        ),
    }
}

fn capability_from_headers(
    tokens: &TokenConfig,
    headers: &HeaderMap,
    host: &str,
) -> Option<Capability> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))?;

    if let Some(admin) = tokens.admin_token.as_deref() {
        if token == admin {
            return Some(Capability::Admin);
        }
    }
    if let Some(secret) = tokens.tenant_secret.as_deref() {
        if token == tenant_token(secret, host) {
            return Some(Capability::TenantUser {
                host: host.to_string(),
            });
        }
    }
    None
}

fn parse_body(body: &Bytes) -> serde_json::Value {
    if body.is_empty() {
        return serde_json::Value::Null;
    }
    serde_json::from_slice(body)
        .unwrap_or_else(|_| serde_json::Value::String(String::from_utf8_lossy(body).into()))
}

fn header_btree(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}

fn client_ip(headers: &HeaderMap, addr: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .unwrap_or_else(|| addr.ip().to_string())
}

fn request_host(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::HOST)?.to_str().ok()?;
    let host = strip_port(raw);
    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}

fn strip_port(authority: &str) -> &str {
    if authority.starts_with('[') {
        match authority.find(']') {
            Some(end) => &authority[..=end],
            None => authority,
        }
    } else {
        authority.split(':').next().unwrap_or(authority)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    message: String,
    status: u16,
}

fn error_response(status: StatusCode, error: &str, message: &str) -> Response {
    let body = ErrorBody {
        error: error.to_string(),
        message: message.to_string(),
        status: status.as_u16(),
    };
    (status, Json(body)).into_response()
}

fn unauthorized() -> Response {
    error_response(
        StatusCode::UNAUTHORIZED,
        "unauthorized",
        "missing or invalid capability token",
    )
}

fn query_error_response(err: QueryError) -> Response {
    match err {
        QueryError::Unauthorized => unauthorized(),
        QueryError::Store(err) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "storage_failure",
            &err.to_string(),
        ),
    }
}
