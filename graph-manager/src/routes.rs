//! HTTP API (§4.8 / §6 "Graph manager HTTP API").

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use chain::Peer;
use serde_json::{json, Value};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};

use crate::crawl::build_network_graph;
use crate::state::SharedState;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/register-node", post(register_node))
        .route("/notify", post(notify))
        .route("/network-graph", get(network_graph))
        .route("/network-stream", get(network_stream))
        .with_state(state)
}

async fn ping() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn register_node(State(state): State<SharedState>, Json(peer): Json<Peer>) -> (StatusCode, Json<Value>) {
    let is_new = state.add_node(peer);
    if is_new {
        let snapshot_state = state.clone();
        tokio::spawn(async move { publish_snapshot(&snapshot_state).await });
    }
    (StatusCode::CREATED, Json(json!({ "status": "registered" })))
}

async fn notify(State(state): State<SharedState>) -> (StatusCode, Json<Value>) {
    tokio::spawn(async move { publish_snapshot(&state).await });
    (StatusCode::OK, Json(json!({ "status": "notified" })))
}

async fn network_graph(State(state): State<SharedState>) -> Json<Value> {
    let graph = build_network_graph(&state).await;
    Json(serde_json::to_value(graph).expect("network graph serializes"))
}

async fn publish_snapshot(state: &SharedState) {
    let graph = build_network_graph(state).await;
    let Ok(body) = serde_json::to_string(&graph) else { return };
    // No receivers is not an error: it just means nobody is subscribed yet.
    let _ = state.updates.send(body);
}

/// Replays the current snapshot to the new subscriber, then forwards every
/// subsequent `/notify`-triggered update. A lagging subscriber's dropped
/// messages (per `broadcast`'s bounded-channel semantics) are silently
/// skipped rather than closing the stream.
async fn network_stream(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let graph = build_network_graph(&state).await;
    let initial = serde_json::to_string(&graph).unwrap_or_else(|_| "{}".to_string());

    let live = BroadcastStream::new(state.updates.subscribe())
        .filter_map(|item| item.ok())
        .map(|body| Ok(Event::default().data(body)));

    let stream = tokio_stream::once(Ok(Event::default().data(initial))).chain(live);

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
