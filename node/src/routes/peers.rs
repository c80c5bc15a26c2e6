//! `GET/POST /peers`: membership list and admission (§4.7 "Peer admission").

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chain::Peer;
use serde_json::{json, Value};

use crate::routes::error_body;
use crate::state::SharedState;

pub async fn list_peers(State(state): State<SharedState>) -> Json<Vec<Peer>> {
    Json(state.peer_store.get_all())
}

pub async fn admit_peer(
    State(state): State<SharedState>,
    Json(record): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let peer: Peer = match serde_json::from_value(record) {
        Ok(peer) => peer,
        Err(_) => return (StatusCode::BAD_REQUEST, error_body("missing_fields")),
    };

    if state.is_self_peer(&peer) {
        return (StatusCode::BAD_REQUEST, error_body("self_peer"));
    }

    if state.peer_store.count() >= state.chain_cfg.max_peers {
        for existing in state.peer_store.get_all() {
            if state.net.ping(&existing).is_err() {
                state.peer_store.remove(&existing);
            }
        }
        if state.peer_store.count() >= state.chain_cfg.max_peers {
            return (StatusCode::TOO_MANY_REQUESTS, error_body("peer_limit_reached"));
        }
    }

    if state.net.ping(&peer).is_err() {
        return (StatusCode::SERVICE_UNAVAILABLE, error_body("peer_unreachable"));
    }

    state.peer_store.add(peer.clone());
    crate::graph_client::notify_graph_manager(&state);

    (StatusCode::CREATED, Json(json!({ "host": peer.host, "port": peer.port })))
}
