//! `POST /mine`: synchronous one-shot mining (§4.7 "Synchronous /mine").

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::Value;

use crate::mining::{mine_once as run_mine_once, MineError};
use crate::routes::error_body;
use crate::state::SharedState;

pub async fn mine_once(State(state): State<SharedState>) -> (StatusCode, Json<Value>) {
    match run_mine_once(&state) {
        Ok(block) => (StatusCode::OK, Json(serde_json::to_value(block).expect("block serializes"))),
        Err(MineError::NotAMiner) => (StatusCode::FORBIDDEN, error_body("not_a_miner")),
        Err(MineError::Interrupted) => (StatusCode::SERVICE_UNAVAILABLE, error_body("mining_interrupted")),
        Err(MineError::Busy) => (StatusCode::CONFLICT, error_body("miner_busy")),
    }
}
