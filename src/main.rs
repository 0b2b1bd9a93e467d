// Parley - Chat Completion Gateway
//
// Parley fronts an upstream chat provider and speaks three client dialects:
// the provider's native v1 (JSON lines) and v2 (SSE) chat protocols, plus
// the OpenAI-compatible dialect (SSE).
//
// Architecture:
// - Gateway (axum): HTTP routes, credential extraction, response shaping
// - Relay: first-success gate + streaming dispatcher (the core)
// - Dialect: wire framing, event normalization, synthetic chunks
// - Upstream (reqwest): provider calls and wire decoding

mod cli;
mod config;
mod dialect;
mod gateway;
mod relay;
mod startup;
mod upstream;
mod util;

use anyhow::Result;
use config::{Config, LogRotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Handle CLI commands first (config --show, --reset, --edit, --update)
    // If a command was handled, exit early
    if cli::handle_cli() {
        return Ok(());
    }

    // Ensure config template exists (helps users discover options)
    Config::ensure_config_exists();

    // Load configuration
    let config = Config::from_env();

    // Initialize tracing/logging
    // Precedence: RUST_LOG env var > config file > default "info"
    let default_filter = format!(
        "parley={},tower_http=debug,axum=debug",
        config.logging.level
    );
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    // Set up file logging if enabled (non-blocking writer with rotation)
    // The guard must be kept alive for the duration of the program to ensure logs flush
    let _file_guard: Option<tracing_appender::non_blocking::WorkerGuard> =
        if config.logging.file_enabled {
            if let Err(e) = std::fs::create_dir_all(&config.logging.file_dir) {
                eprintln!(
                    "Warning: Could not create log directory {:?}: {}",
                    config.logging.file_dir, e
                );
                // Fall back to stdout-only logging
                tracing_subscriber::registry()
                    .with(filter)
                    .with(tracing_subscriber::fmt::layer())
                    .init();
                None
            } else {
                // Create rolling file appender based on configured rotation
                let file_appender = match config.logging.file_rotation {
                    LogRotation::Hourly => tracing_appender::rolling::hourly(
                        &config.logging.file_dir,
                        &config.logging.file_prefix,
                    ),
                    LogRotation::Daily => tracing_appender::rolling::daily(
                        &config.logging.file_dir,
                        &config.logging.file_prefix,
                    ),
                    LogRotation::Never => tracing_appender::rolling::never(
                        &config.logging.file_dir,
                        &config.logging.file_prefix,
                    ),
                };

                // Wrap in non-blocking writer (writes happen in background thread)
                let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

                // File layer uses JSON format for structured log parsing
                tracing_subscriber::registry()
                    .with(filter)
                    .with(tracing_subscriber::fmt::layer())
                    .with(
                        tracing_subscriber::fmt::layer()
                            .json()
                            .with_writer(non_blocking)
                            .with_ansi(false),
                    )
                    .init();

                Some(guard)
            }
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();

            None
        };

    // Create shutdown channel for graceful gateway shutdown
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    // Spawn the gateway server task
    let gateway_config = config.clone();
    let gateway_handle = tokio::spawn(async move {
        gateway::start_gateway(gateway_config, shutdown_rx)
            .await
            .expect("Gateway server failed");
    });

    // Print startup banner after initialization
    startup::print_startup(&config);
    startup::log_startup(&config);

    // Wait for Ctrl+C
    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down...");

    // Signal the gateway to shut down gracefully
    // If the send fails, the gateway has already shut down (which is fine)
    let _ = shutdown_tx.send(());

    // Wait for the server task to finish
    let _ = gateway_handle.await;

    tracing::info!("Shutdown complete");
    Ok(())
}
