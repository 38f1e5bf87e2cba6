//! Marquee HTTP server.

use marquee::{AppState, Config, Platform, build_router};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "marquee=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Marquee booking platform");

    let config = Config::from_env();
    info!(
        host = %config.server.host,
        port = config.server.port,
        hold_ttl_secs = config.booking.hold_ttl_secs,
        "Configuration loaded"
    );

    let platform = Platform::new(config.clone()).await?;
    platform.start().await?;
    info!("Platform assembled");

    let state = AppState::from_platform(&platform);
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped, draining ledger effects");
    platform
        .ledger
        .shutdown(Duration::from_secs(config.server.shutdown_timeout))
        .await?;
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received");
}
