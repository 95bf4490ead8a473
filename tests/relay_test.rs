use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;
use webhook_capture::{
    Attachment, Capability, ForwardTarget, IngestError, QueryError, Relay, RelayConfig,
    WebhookEvent,
};

async fn ingest(relay: &Relay, host: &str, path: &str, body: serde_json::Value) -> WebhookEvent {
    relay
        .ingest(host, path, body, BTreeMap::new(), "127.0.0.1", Vec::new())
        .await
        .expect("ingest")
}

#[tokio::test]
async fn ingest_returns_the_stored_event() {
    let relay = Relay::new(RelayConfig::default());

    let mut headers = BTreeMap::new();
    headers.insert("X-Custom-Header".to_string(), "yes".to_string());

    let event = relay
        .ingest(
            "shop1",
            "/order",
            json!({"id": 1}),
            headers,
            "10.0.0.9",
            Vec::new(),
        )
        .await
        .expect("ingest");

    assert_eq!(event.host, "shop1");
    assert_eq!(event.path, "/order");
    assert_eq!(event.body, json!({"id": 1}));
    assert_eq!(event.ip, "10.0.0.9");
    assert!(!event.id.0.is_empty());

    // Header names are stored lowercased.
    assert_eq!(
        event.headers.get("x-custom-header").map(String::as_str),
        Some("yes")
    );

    let caller = Capability::TenantUser {
        host: "shop1".to_string(),
    };
    assert_eq!(
        relay.count_for_host(&caller, "shop1").await.expect("count"),
        1
    );
}

#[tokio::test]
async fn ingest_normalizes_bare_paths() {
    let relay = Relay::new(RelayConfig::default());
    let event = ingest(&relay, "shop1", "order", json!(null)).await;
    assert_eq!(event.path, "/order");
}

#[tokio::test]
async fn empty_host_is_rejected() {
    let relay = Relay::new(RelayConfig::default());
    let result = relay
        .ingest("", "/x", json!(null), BTreeMap::new(), "127.0.0.1", Vec::new())
        .await;
    assert!(matches!(result, Err(IngestError::EmptyHost)));

    let grouped = relay
        .counts_by_host(&Capability::Admin)
        .await
        .expect("grouped");
    assert!(grouped.is_empty());
}

#[tokio::test]
async fn counts_are_live_and_grouped_per_host() {
    let relay = Relay::new(RelayConfig::default());

    ingest(&relay, "shop1", "/order", json!({"n": 1})).await;
    ingest(&relay, "shop1", "/refund", json!({"n": 2})).await;
    ingest(&relay, "shop1", "/order", json!({"n": 3})).await;
    ingest(&relay, "blog.example", "/comment", json!({"n": 4})).await;

    let shop1 = Capability::TenantUser {
        host: "shop1".to_string(),
    };
    assert_eq!(
        relay.count_for_host(&shop1, "shop1").await.expect("count"),
        3
    );

    let grouped = relay
        .counts_by_host(&Capability::Admin)
        .await
        .expect("grouped");
    assert_eq!(
        grouped,
        vec![("blog.example".to_string(), 1), ("shop1".to_string(), 3)]
    );

    let total: u64 = grouped.iter().map(|(_, count)| count).sum();
    assert_eq!(total, 4);
}

#[tokio::test]
async fn tenant_user_is_bound_to_its_host() {
    let relay = Relay::new(RelayConfig::default());
    ingest(&relay, "b", "/hook", json!(1)).await;

    let bound_to_a = Capability::TenantUser {
        host: "a".to_string(),
    };
    assert!(matches!(
        relay.count_for_host(&bound_to_a, "b").await,
        Err(QueryError::Unauthorized)
    ));
    assert!(matches!(
        relay.store_metadata(&bound_to_a, "b").await,
        Err(QueryError::Unauthorized)
    ));

    // Admins may read any tenant.
    assert_eq!(
        relay
            .count_for_host(&Capability::Admin, "b")
            .await
            .expect("count"),
        1
    );
}

#[tokio::test]
async fn grouped_counts_require_admin() {
    let relay = Relay::new(RelayConfig::default());
    let user = Capability::TenantUser {
        host: "a".to_string(),
    };
    assert!(matches!(
        relay.counts_by_host(&user).await,
        Err(QueryError::Unauthorized)
    ));
    assert!(relay.counts_by_host(&Capability::Admin).await.is_ok());
}

#[tokio::test]
async fn delete_is_scoped_to_one_host() {
    let relay = Relay::new(RelayConfig::default());
    ingest(&relay, "a", "/one", json!(1)).await;
    ingest(&relay, "a", "/two", json!(2)).await;
    ingest(&relay, "b", "/three", json!(3)).await;

    let outcome = relay.delete_events(Some("a")).await.expect("delete");
    assert_eq!(outcome.count, 2);

    assert_eq!(
        relay
            .count_for_host(&Capability::Admin, "a")
            .await
            .expect("count"),
        0
    );
    assert_eq!(
        relay
            .count_for_host(&Capability::Admin, "b")
            .await
            .expect("count"),
        1
    );
}

#[tokio::test]
async fn unscoped_delete_clears_every_tenant() {
    let relay = Relay::new(RelayConfig::default());
    ingest(&relay, "a", "/one", json!(1)).await;
    ingest(&relay, "b", "/two", json!(2)).await;
    ingest(&relay, "c", "/three", json!(3)).await;

    let outcome = relay.delete_events(None).await.expect("delete");
    assert_eq!(outcome.count, 3);

    let grouped = relay
        .counts_by_host(&Capability::Admin)
        .await
        .expect("grouped");
    assert!(grouped.is_empty());
}

#[tokio::test]
async fn attachments_are_folded_into_the_stored_body() {
    let relay = Relay::new(RelayConfig::default());
    let attachment = Attachment {
        filename: "invoice.pdf".to_string(),
        content_type: Some("application/pdf".to_string()),
        data: vec![1, 2, 3, 4],
    };

    let event = relay
        .ingest(
            "shop1",
            "/upload",
            json!({"note": "attached"}),
            BTreeMap::new(),
            "127.0.0.1",
            vec![attachment],
        )
        .await
        .expect("ingest");

    assert_eq!(event.body["body"], json!({"note": "attached"}));
    assert_eq!(event.body["attachments"][0]["filename"], "invoice.pdf");
    assert_eq!(event.body["attachments"][0]["size"], 4);
    assert!(event.body["attachments"][0]["data_base64"].is_string());
}

#[tokio::test]
async fn forwarding_never_delays_the_ingest_response() {
    let config = RelayConfig {
        forward_target: Some(ForwardTarget::new("mirror.example")),
        ..RelayConfig::default()
    };
    let relay = Relay::new(config);

    let started = Instant::now();
    let event = ingest(&relay, "shop1", "/order", json!({"id": 7})).await;
    assert!(started.elapsed() < Duration::from_millis(40));

    // The stored event is unaffected by whatever the forward does.
    let stored = relay.store().get(&event.id).await.expect("get");
    assert!(stored.is_some());

    tokio::time::sleep(Duration::from_millis(80)).await;
    let caller = Capability::TenantUser {
        host: "shop1".to_string(),
    };
    assert_eq!(
        relay.count_for_host(&caller, "shop1").await.expect("count"),
        1
    );
}

#[cfg(not(feature = "http"))]
#[tokio::test]
async fn simulated_forward_classifies_timeouts() {
    use webhook_capture::{forward_event, ForwardFailure, ForwardOutcome};

    let relay = Relay::new(RelayConfig::default());
    let event = ingest(&relay, "shop1", "/order", json!({"id": 1})).await;

    let healthy = ForwardTarget::new("mirror.example");
    assert_eq!(
        forward_event(&healthy, &event).await,
        ForwardOutcome::Forwarded
    );

    let strict = ForwardTarget::new("mirror.example").with_timeout(Duration::from_millis(10));
    assert_eq!(
        forward_event(&strict, &event).await,
        ForwardOutcome::Failed(ForwardFailure::Timeout)
    );
}

#[tokio::test]
async fn concurrent_ingest_loses_no_writes() {
    let relay = Arc::new(Relay::new(RelayConfig::default()));

    let mut handles = Vec::new();
    for i in 0..100 {
        let relay = relay.clone();
        handles.push(tokio::spawn(async move {
            relay
                .ingest(
                    "shop1",
                    "/order",
                    json!({ "seq": i }),
                    BTreeMap::new(),
                    "127.0.0.1",
                    Vec::new(),
                )
                .await
                .expect("ingest")
        }));
    }

    let mut ids = HashSet::new();
    for handle in handles {
        let event = handle.await.expect("join");
        ids.insert(event.id.0.clone());
    }

    assert_eq!(ids.len(), 100);
    let caller = Capability::TenantUser {
        host: "shop1".to_string(),
    };
    assert_eq!(
        relay.count_for_host(&caller, "shop1").await.expect("count"),
        100
    );
}

#[tokio::test]
async fn auth_metadata_requires_no_capability() {
    let relay = Relay::new(RelayConfig::default());
    let metadata = relay.auth_metadata();
    assert_eq!(metadata.scheme, "bearer");
    assert_eq!(metadata.token_header, "authorization");
    assert_eq!(metadata.levels.len(), 2);
}

#[tokio::test]
async fn store_metadata_reflects_configuration() {
    let config = RelayConfig {
        retention_hint_secs: Some(86_400),
        event_quota: Some(10_000),
        ..RelayConfig::default()
    };
    let relay = Relay::new(config);

    let caller = Capability::TenantUser {
        host: "shop1".to_string(),
    };
    let metadata = relay
        .store_metadata(&caller, "shop1")
        .await
        .expect("metadata");
    assert_eq!(metadata.host, "shop1");
    assert_eq!(metadata.retention_hint_secs, Some(86_400));
    assert_eq!(metadata.event_quota, Some(10_000));
}

#[tokio::test]
async fn events_are_readable_by_id_and_host() {
    let relay = Relay::new(RelayConfig::default());
    let first = ingest(&relay, "shop1", "/a", json!(1)).await;
    let second = ingest(&relay, "shop1", "/b", json!(2)).await;
    ingest(&relay, "other", "/c", json!(3)).await;

    let store = relay.store();
    let fetched = store.get(&first.id).await.expect("get").expect("present");
    assert_eq!(fetched.path, "/a");

    let events = store.events_for_host("shop1").await.expect("events");
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].id, first.id);
    assert_eq!(events[1].id, second.id);
    assert!(events[0].created_at_secs <= events[1].created_at_secs);
}
