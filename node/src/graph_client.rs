//! Fire-and-forget integration with an optional centralized graph manager
//! (a separate out-of-band process): self-registration on startup and
//! best-effort change notifications afterward.

use std::time::Duration;

use crate::state::AppState;

/// Notifies the configured graph manager that the local chain or peer set
/// just changed. Runs on its own thread so callers (the acceptance path,
/// the mining loop) never block on it, and logs failures at `debug` since
/// they're expected and non-fatal (the manager may simply be down).
pub fn notify_graph_manager(state: &AppState) {
    let Some(base_url) = state.graph_manager_url.clone() else { return };
    let timeout = state.chain_cfg.notify_timeout;
    std::thread::spawn(move || {
        let client = match reqwest::blocking::Client::builder().timeout(timeout).build() {
            Ok(c) => c,
            Err(e) => {
                tracing::debug!(error = %e, "notify_graph_manager: failed to build http client");
                return;
            }
        };
        let url = format!("{}/notify", base_url.trim_end_matches('/'));
        if let Err(e) = client.post(&url).send() {
            tracing::debug!(url, error = %e, "notify_graph_manager: request failed");
        }
    });
}

/// Self-registers this node with the configured graph manager, retrying a
/// handful of times with a short backoff so a manager that starts slightly
/// after its nodes still picks them all up (§4.7 step 6).
pub fn register_with_graph_manager(state: &AppState) {
    let Some(base_url) = state.graph_manager_url.clone() else { return };
    let timeout = state.chain_cfg.register_node_timeout;
    let host = state.own.host.clone();
    let port = state.own.port;

    let client = match reqwest::blocking::Client::builder().timeout(timeout).build() {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(error = %e, "register_with_graph_manager: failed to build http client");
            return;
        }
    };
    let url = format!("{}/register-node", base_url.trim_end_matches('/'));
    let body = serde_json::json!({ "host": host, "port": port });

    const ATTEMPTS: u32 = 3;
    for attempt in 1..=ATTEMPTS {
        match client.post(&url).json(&body).send() {
            Ok(resp) if resp.status().is_success() => {
                tracing::info!(url, "registered with graph manager");
                return;
            }
            Ok(resp) => {
                tracing::warn!(url, status = %resp.status(), attempt, "graph manager rejected registration");
            }
            Err(e) => {
                tracing::warn!(url, error = %e, attempt, "graph manager registration attempt failed");
            }
        }
        if attempt < ATTEMPTS {
            std::thread::sleep(Duration::from_millis(300 * attempt as u64));
        }
    }
    tracing::warn!(url, "giving up on graph manager self-registration");
}
