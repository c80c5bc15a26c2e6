//! `GET/POST /blocks`: chain dump and the block-acceptance entry point.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chain::Block;
use serde_json::{json, Value};

use crate::acceptance::{accept_block, AcceptOutcome};
use crate::routes::error_body;
use crate::state::SharedState;

pub async fn dump_chain(State(state): State<SharedState>) -> Json<Vec<Block>> {
    let core = state.core.lock().expect("node core mutex poisoned");
    Json(core.chain.clone())
}

pub async fn receive_block(
    State(state): State<SharedState>,
    Json(record): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let block: Block = match serde_json::from_value(record) {
        Ok(block) => block,
        Err(_) => return (StatusCode::BAD_REQUEST, error_body("malformed_block")),
    };
    let height = block.height;
    let mut core = state.core.lock().expect("node core mutex poisoned");
    match accept_block(&state, &mut core, block) {
        AcceptOutcome::Appended => (StatusCode::CREATED, Json(json!({ "status": "accepted", "height": height }))),
        AcceptOutcome::Reorganized => (StatusCode::CREATED, Json(json!({ "status": "reorganized", "height": height }))),
        AcceptOutcome::Buffered => (StatusCode::ACCEPTED, Json(json!({ "status": "orphan-buffered", "height": height }))),
        AcceptOutcome::Duplicate => (StatusCode::BAD_REQUEST, error_body("duplicate")),
        AcceptOutcome::Malformed => (StatusCode::BAD_REQUEST, error_body("malformed_block")),
        AcceptOutcome::Rejected(reason) => (StatusCode::BAD_REQUEST, error_body(reason)),
    }
}
