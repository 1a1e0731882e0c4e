use anyhow::Result;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{error, info};

use chat_gateway::utils::telemetry::init_telemetry;
use chat_gateway::{build_router, AppState, Settings};

#[tokio::main]
async fn main() -> Result<()> {
    init_telemetry();

    info!("🚀 Starting chat gateway...");

    // Load configuration
    let settings = Settings::load()?;
    info!(provider = %settings.provider.name, "✅ Configuration loaded");

    // Selection errors are logged and answered per chat request
    let state = AppState::from_settings(&settings);
    if let Ok(provider) = state.chat.provider() {
        info!(provider = %provider.kind(), model = %provider.model(), "✅ Provider ready");
    }

    if !state.chat.is_configured() {
        error!("access codes or provider configuration missing; chat requests will fail until configured");
    }
    if settings.server.trust_forwarded_headers {
        info!("client identity taken from x-forwarded-for / client-ip");
    }

    // Periodic sweep of expired rate-limit windows
    let cleanup_every = settings.rate_limit.cleanup_interval_seconds;
    if cleanup_every > 0 {
        let limiter = state.validate.limiter().clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(cleanup_every));
            loop {
                ticker.tick().await;
                limiter.cleanup_expired();
            }
        });
    }

    let app = build_router(state, settings.server.body_limit_bytes);

    // Server address
    let addr = SocketAddr::from((
        settings.server.host.parse::<std::net::IpAddr>()?,
        settings.server.port,
    ));

    info!("🎯 Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("👋 Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
    }
}
