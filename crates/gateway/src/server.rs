//! Router assembly and the serve loop.

use std::{net::SocketAddr, sync::Arc};

use {
    axum::{Router, routing::post},
    tokio::net::TcpListener,
    tracing::info,
};

use crate::{campaign_routes, channel_routes, state::AppState, webhook_routes};

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api/campaigns", campaign_routes::router())
        .nest("/api/channels", channel_routes::router())
        .route("/webhooks/provider", post(webhook_routes::provider_webhook))
        .with_state(state)
}

/// Serve until ctrl-c, then drain running campaign dispatches.
pub async fn serve(addr: SocketAddr, state: Arc<AppState>) -> anyhow::Result<()> {
    let campaigns = Arc::clone(&state.campaigns);
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "gateway listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    campaigns.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
