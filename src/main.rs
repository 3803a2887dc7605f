//! FridgeCam Server
//!
//! Main entry point for the fridge camera detection service.

use fridgecam_server::{
    state::{AppConfig, AppState},
    web_api,
};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fridgecam_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting FridgeCam server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::default();
    tracing::info!(
        detector_url = %config.detector_url,
        metadata_url = %config.metadata_url,
        snapshot_url = %config.snapshot_url,
        poll_interval_ms = config.poll_interval_ms,
        resolve_mode = ?config.resolve_mode,
        "Configuration loaded"
    );

    let state = AppState::new(config.clone());

    // Best-effort detector reachability check at boot
    if state.detector.health_check().await {
        tracing::info!(url = %config.detector_url, "Detector reachable");
    } else {
        tracing::warn!(url = %config.detector_url, "Detector not reachable, polling will retry");
    }

    // Start polling on boot if configured
    if config.poll_autostart {
        state
            .scheduler
            .start(Duration::from_millis(config.poll_interval_ms))
            .await;
    }

    // CORS for the UI layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = web_api::create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!(addr = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
