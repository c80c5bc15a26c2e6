// graph-manager/src/main.rs

//! Centralized topology aggregator for the peer-to-peer network (§4.8).
//!
//! Nodes self-register here on startup and notify on every chain or peer
//! change; this process crawls the resulting graph on demand and streams
//! snapshots to `/network-stream` subscribers.

mod config;
mod crawl;
mod routes;
mod state;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use config::Cli;
use state::AppState;
use tokio::signal;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "graph_manager=info".to_string()),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let cli = Cli::parse();

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .map_err(|e| format!("failed to build http client: {e}"))?;
    let state = Arc::new(AppState::new(http));

    let app = routes::router(state);

    let addr = format!("{}:{}", cli.host, cli.port);
    tracing::info!(addr, "graph manager listening");

    let listener =
        tokio::net::TcpListener::bind(&addr).await.map_err(|e| format!("failed to bind {addr}: {e}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| format!("graph manager server error: {e}"))?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
