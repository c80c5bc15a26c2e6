//! `GET /balance/{pubkey}`: settled chain balance plus pending mempool delta.

use axum::extract::{Path, State};

use chain::Amount;

use crate::mempool::available_balance;
use crate::state::SharedState;

pub async fn balance(State(state): State<SharedState>, Path(pubkey): Path<String>) -> String {
    let core = state.core.lock().expect("node core mutex poisoned");
    let net = available_balance(&core.chain, &core.mempool, &pubkey);
    let sub_units = net.max(0) as u64;
    Amount::from_sub_units(sub_units).to_string()
}
