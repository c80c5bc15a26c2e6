// node/src/main.rs

//! Peer-to-peer proof-of-work cryptocurrency node binary.
//!
//! Hosts the HTTP API (§6), owns the mempool, drives the mining thread,
//! executes the block-acceptance state machine, and runs bootstrap against
//! seed peers.

mod acceptance;
mod bootstrap;
mod config;
mod graph_client;
mod mempool;
mod mining;
mod routes;
mod state;

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use clap::Parser;
use tokio::signal;

use chain::{ChainConfig, HttpNetworkClient, Peer, RocksDbChainStore, RocksDbConfig, RocksDbPeerConfig, RocksDbPeerStore};
use config::Cli;
use state::{AppState, NodeCore, SharedState};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "node=info,chain=info".to_string()))
        .init();

    if let Err(e) = run() {
        eprintln!("fatal error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let cli = Cli::parse();
    let chain_cfg = ChainConfig::default();

    let chain_store = RocksDbChainStore::open(&RocksDbConfig { path: cli.chain_db_path(), create_if_missing: true })
        .map_err(|e| format!("failed to open chain store at {}: {e}", cli.chain_db_path()))?;
    let peer_store = RocksDbPeerStore::open(&RocksDbPeerConfig { path: cli.peers_db_path(), create_if_missing: true })
        .map_err(|e| format!("failed to open peer store at {}: {e}", cli.peers_db_path()))?;

    let public_key = cli.load_public_key();
    let own = Peer { host: cli.host.clone(), port: cli.port };
    let seed_peers: Vec<Peer> =
        cli.seed_peers().into_iter().map(|(host, port)| Peer { host, port }).collect();

    let state: SharedState = Arc::new(AppState {
        core: Mutex::new(NodeCore::default()),
        chain_store: Box::new(chain_store),
        peer_store: Box::new(peer_store),
        net: Box::new(HttpNetworkClient::new(chain_cfg.rpc_timeout)),
        chain_cfg,
        own,
        public_key,
        role: cli.role,
        seed_peers,
        graph_manager_url: cli.centralized_manager.clone(),
        mining_enabled: AtomicBool::new(false),
        mining_stop: Arc::new(AtomicBool::new(false)),
        mining_thread: Mutex::new(None),
        mining_lock: Mutex::new(()),
    });

    bootstrap::initialize_chain(&state);
    bootstrap::start_background_tasks(state.clone());

    let addr = format!("{}:{}", cli.host, cli.port);
    tracing::info!(addr, role = ?cli.role, "node listening");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to start async runtime: {e}"))?;

    runtime.block_on(serve(state, addr))
}

async fn serve(state: SharedState, addr: String) -> Result<(), String> {
    let app = routes::router(state);

    let listener =
        tokio::net::TcpListener::bind(&addr).await.map_err(|e| format!("failed to bind {addr}: {e}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| format!("node server error: {e}"))?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
