//! HTTP API surface (§6): one module per resource, wired together into a
//! single `axum::Router` by `router()`.

mod balance;
mod blocks;
mod info;
mod mine;
mod miner;
mod peers;
mod ping;
mod transactions;

use axum::routing::{get, post};
use axum::Router;

use crate::state::SharedState;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/ping", get(ping::ping))
        .route("/peers", get(peers::list_peers).post(peers::admit_peer))
        .route("/blocks", get(blocks::dump_chain).post(blocks::receive_block))
        .route("/mine", post(mine::mine_once))
        .route("/transactions", get(transactions::dump_mempool).post(transactions::admit_transaction))
        .route("/balance/{pubkey}", get(balance::balance))
        .route("/info", get(info::info))
        .route("/miner/start", post(miner::start))
        .route("/miner/stop", post(miner::stop))
        .route("/miner/status", get(miner::status))
        .with_state(state)
}

/// `{error: "..."}` body shared by every 4xx/5xx response (§7).
pub fn error_body(message: impl Into<String>) -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "error": message.into() }))
}
