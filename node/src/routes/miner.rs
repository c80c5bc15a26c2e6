//! `/miner/{start,stop,status}`: background-miner control.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use crate::config::Role;
use crate::mining::{is_mining, start_miner, stop_miner};
use crate::routes::error_body;
use crate::state::SharedState;

pub async fn start(State(state): State<SharedState>) -> (StatusCode, Json<Value>) {
    if state.role != Role::Miner {
        return (StatusCode::FORBIDDEN, error_body("not_a_miner"));
    }
    start_miner(state.clone());
    (StatusCode::OK, Json(json!({ "status": "started" })))
}

pub async fn stop(State(state): State<SharedState>) -> (StatusCode, Json<Value>) {
    stop_miner(&state);
    (StatusCode::OK, Json(json!({ "status": "stopped" })))
}

pub async fn status(State(state): State<SharedState>) -> Json<Value> {
    Json(json!({ "running": is_mining(&state), "role": state.role }))
}
