//! Process-wide graph manager state: the set of self-registered nodes and
//! the broadcast channel `/network-stream` subscribers read from.

use std::collections::HashSet;
use std::sync::Mutex;

use chain::Peer;
use tokio::sync::broadcast;

use crate::config::SUBSCRIBER_CHANNEL_CAPACITY;

pub struct AppState {
    pub known_nodes: Mutex<HashSet<Peer>>,
    pub http: reqwest::Client,
    /// Carries serialized network-graph snapshots to `/network-stream`
    /// subscribers. `broadcast` drops the oldest unread message for a
    /// lagging receiver rather than blocking the sender, which is exactly
    /// the bounded, drop-on-overflow behavior a slow SSE client needs.
    pub updates: broadcast::Sender<String>,
}

impl AppState {
    pub fn new(http: reqwest::Client) -> Self {
        let (updates, _) = broadcast::channel(SUBSCRIBER_CHANNEL_CAPACITY);
        AppState { known_nodes: Mutex::new(HashSet::new()), http, updates }
    }

    pub fn add_node(&self, peer: Peer) -> bool {
        let mut nodes = self.known_nodes.lock().expect("known_nodes mutex poisoned");
        nodes.insert(peer)
    }

    pub fn known_nodes(&self) -> Vec<Peer> {
        self.known_nodes.lock().expect("known_nodes mutex poisoned").iter().cloned().collect()
    }
}

pub type SharedState = std::sync::Arc<AppState>;

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(port: u16) -> Peer {
        Peer { host: "127.0.0.1".to_string(), port }
    }

    #[test]
    fn add_node_reports_whether_it_is_new() {
        let state = AppState::new(reqwest::Client::new());
        assert!(state.add_node(peer(5001)));
        assert!(!state.add_node(peer(5001)));
        assert_eq!(state.known_nodes().len(), 1);
    }
}
