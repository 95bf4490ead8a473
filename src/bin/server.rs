use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use webhook_capture::http::{router, AppState, TokenConfig};
use webhook_capture::{ForwardTarget, Relay, RelayConfig};

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("signal received, starting graceful shutdown");
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

fn forward_target_from_env() -> Option<ForwardTarget> {
    let host = env_var("WEBHOOK_CAPTURE_FORWARD_HOST")?;
    let mut target = ForwardTarget::new(host);
    if let Some(scheme) = env_var("WEBHOOK_CAPTURE_FORWARD_SCHEME") {
        target = target.with_scheme(scheme);
    }
    if let Some(secs) = env_var("WEBHOOK_CAPTURE_FORWARD_TIMEOUT_SECS").and_then(|v| v.parse().ok())
    {
        target = target.with_timeout(Duration::from_secs(secs));
    }
    if let Some(secret) = env_var("WEBHOOK_CAPTURE_FORWARD_SECRET") {
        target = target.with_secret(secret.into_bytes());
    }
    Some(target)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = RelayConfig {
        forward_target: forward_target_from_env(),
        retention_hint_secs: env_var("WEBHOOK_CAPTURE_RETENTION_SECS").and_then(|v| v.parse().ok()),
        event_quota: env_var("WEBHOOK_CAPTURE_EVENT_QUOTA").and_then(|v| v.parse().ok()),
        ..RelayConfig::default()
    };
    let tokens = TokenConfig {
        admin_token: env_var("WEBHOOK_CAPTURE_ADMIN_TOKEN"),
        tenant_secret: env_var("WEBHOOK_CAPTURE_TENANT_SECRET").map(String::into_bytes),
    };

    let addr: SocketAddr = env_var("WEBHOOK_CAPTURE_ADDR")
        .unwrap_or_else(|| "0.0.0.0:3000".to_string())
        .parse()?;

    let relay = Arc::new(Relay::new(config));
    let app = router(AppState { relay, tokens });

    info!("webhook capture relay listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}
