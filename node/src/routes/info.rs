//! `GET /info`: a single-node snapshot used by clients and the graph manager.

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::mempool::chain_balance;
use crate::mining::is_mining;
use crate::state::SharedState;

pub async fn info(State(state): State<SharedState>) -> Json<Value> {
    let core = state.core.lock().expect("node core mutex poisoned");
    let balance = chain_balance(&core.chain, &state.public_key);

    let forks: Vec<Value> = core
        .orphans
        .iter()
        .filter(|(_, blocks)| !blocks.is_empty())
        .map(|(prev_hash, blocks)| {
            json!({
                "prev_hash": prev_hash,
                "blocks": blocks,
            })
        })
        .collect();

    Json(json!({
        "public_key": state.public_key,
        "balance": balance,
        "role": state.role,
        "chain": core.chain,
        "pending_transactions": core.mempool,
        "forks": forks,
        "mining": is_mining(&state),
    }))
}
