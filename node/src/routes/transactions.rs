//! `GET/POST /transactions`: mempool dump and admission.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chain::SignedTransaction;
use serde_json::{json, Value};

use crate::mempool::add_transaction;
use crate::routes::error_body;
use crate::state::SharedState;

pub async fn dump_mempool(State(state): State<SharedState>) -> Json<Vec<SignedTransaction>> {
    let core = state.core.lock().expect("node core mutex poisoned");
    Json(core.mempool.clone())
}

pub async fn admit_transaction(
    State(state): State<SharedState>,
    Json(record): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let signed = match SignedTransaction::decode(record) {
        Ok(signed) => signed,
        Err(e) => return (StatusCode::BAD_REQUEST, error_body(e.to_string())),
    };
    let txid = signed.txid();

    let outcome = {
        let mut core = state.core.lock().expect("node core mutex poisoned");
        let before = core.mempool.len();
        let result = add_transaction(&mut core, signed.clone());
        let crossed_mining_min = result.is_ok()
            && before < state.chain_cfg.mining_min
            && core.mempool.len() >= state.chain_cfg.mining_min;
        (result, crossed_mining_min)
    };

    let (result, crossed_mining_min) = outcome;
    if crossed_mining_min {
        state.interrupt_miner();
    }

    match result {
        Ok(()) => {
            state.net.broadcast_transaction(&state.peer_store.get_all(), &signed);
            (StatusCode::CREATED, Json(json!({ "status": "accepted", "txid": txid })))
        }
        Err(e) => (StatusCode::BAD_REQUEST, error_body(e.to_string())),
    }
}
