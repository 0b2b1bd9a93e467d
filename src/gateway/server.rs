//! Gateway server setup and initialization

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;

use crate::config::Config;

use super::handlers;
use super::state::GatewayState;

/// Start the gateway server
pub async fn start_gateway(
    config: Config,
    shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) -> Result<()> {
    let bind_addr = config.bind_addr;
    let state = GatewayState::from_config(&config)?;

    let app = Router::new()
        // Native chat dialects
        .route("/v1/chat", post(handlers::chat_v1))
        .route("/v2/chat", post(handlers::chat_v2))
        // OpenAI-compatible dialect, two upstream targets
        .route("/v1/chat/completions", post(handlers::openai_chat))
        .route(
            "/compatibility/v1/chat/completions",
            post(handlers::compat_chat),
        )
        // Liveness probe
        .route("/ping", get(handlers::ping))
        .with_state(state);

    tracing::info!("Starting gateway on {}", bind_addr);

    // Bind and serve
    let listener = TcpListener::bind(bind_addr)
        .await
        .context("Failed to bind to address")?;

    tracing::info!("Gateway listening on {}", bind_addr);

    // Start serving requests with graceful shutdown
    // When shutdown_rx receives a signal, the server stops accepting new
    // connections and finishes in-flight requests
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_rx.await.ok();
        })
        .await
        .context("Server error")?;

    tracing::info!("Gateway shut down gracefully");
    Ok(())
}
