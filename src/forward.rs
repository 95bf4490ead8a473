//! Best-effort replication of captured events to the configured target.
//!
//! One attempt per event, bounded by the target timeout. The outcome is
//! recorded out-of-band and is invisible to the caller whose event
//! produced it; the stored event is unaffected either way.

use crate::error::{ForwardFailure, ForwardOutcome};
use crate::signing::build_signature_headers;
use crate::types::{ForwardTarget, WebhookEvent};

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

/// Correlation header carrying the stored event identifier.
pub const EVENT_ID_HEADER: &str = "x-webhook-event-id";

/// Correlation header carrying the host the event was captured under.
pub const ORIGIN_HOST_HEADER: &str = "x-webhook-origin-host";

// Recomputed by the client for the new connection; never replicated.
#[cfg(feature = "http")]
const SKIPPED_HEADERS: [&str; 2] = ["host", "content-length"];

/// Forward one stored event to the target.
///
/// The copy carries the original body and headers plus the correlation
/// headers, so the target can deduplicate on the event identifier.
pub async fn forward_event(
    #[cfg(feature = "http")] client: &reqwest::Client,
    target: &ForwardTarget,
    event: &WebhookEvent,
) -> ForwardOutcome {
    let payload = event.body.to_string().into_bytes();
    let signature = build_signature_headers(target, &payload);

    #[cfg(feature = "http")]
    {
        let url = format!("{}://{}{}", target.scheme, target.host, event.path);
        let mut request = client
            .post(&url)
            .body(payload)
            .timeout(target.timeout);

        for (name, value) in &event.headers {
            if SKIPPED_HEADERS.contains(&name.as_str()) {
                continue;
            }
            request = request.header(name.as_str(), value.as_str());
        }

        request = request
            .header(EVENT_ID_HEADER, event.id.0.as_str())
            .header(ORIGIN_HOST_HEADER, event.host.as_str());

        if let Some((name, value)) = signature.signature_header {
            request = request.header(name, value);
        }
        if let Some((name, value)) = signature.timestamp_header {
            request = request.header(name, value);
        }

        let outcome = match request.send().await {
            Ok(resp) => {
                if resp.status().is_success() {
                    ForwardOutcome::Forwarded
                } else if resp.status().is_client_error() {
                    ForwardOutcome::Failed(ForwardFailure::ClientError)
                } else {
                    ForwardOutcome::Failed(ForwardFailure::RemoteError)
                }
            }
            Err(err) => {
                if err.is_timeout() {
                    ForwardOutcome::Failed(ForwardFailure::Timeout)
                } else {
                    ForwardOutcome::Failed(ForwardFailure::Network)
                }
            }
        };
        record_outcome(&outcome);
        outcome
    }

    #[cfg(not(feature = "http"))]
    {
        let _ = (payload, signature);
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let outcome = if target.timeout < std::time::Duration::from_millis(50) {
            ForwardOutcome::Failed(ForwardFailure::Timeout)
        } else {
            ForwardOutcome::Forwarded
        };
        record_outcome(&outcome);
        outcome
    }
}

fn record_outcome(outcome: &ForwardOutcome) {
    match outcome {
        ForwardOutcome::Forwarded => {
            metric_inc("capture.forward.success");
            trace_event("capture.forward.success");
        }
        ForwardOutcome::Failed(_) => {
            metric_inc("capture.forward.failed");
            trace_event("capture.forward.failed");
        }
    }
}
