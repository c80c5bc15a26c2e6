//! Startup sequence and the background bootstrap task (§4.7 steps 1-6).

use std::collections::HashSet;

use chain::{validate_chain, Block, NetworkClient, Peer};
use rand::seq::SliceRandom;
use rand::thread_rng;

use crate::graph_client::{notify_graph_manager, register_with_graph_manager};
use crate::mining::start_miner;
use crate::state::{AppState, NodeCore, SharedState};

/// Runs steps 1-3 of the startup sequence: adopt a longer valid chain from
/// a seed peer if one exists, otherwise create and persist genesis; then
/// rebuild `known_hashes` from whatever ended up persisted.
pub fn initialize_chain(state: &AppState) {
    let mut core = state.core.lock().expect("node core mutex poisoned");
    core.chain = state.chain_store.load_chain();

    if core.chain.is_empty() {
        if let Some((chain, mempool)) = fetch_longer_chain_from_seeds(state) {
            core.chain = chain;
            core.mempool = mempool;
        }
    }

    if core.chain.is_empty() {
        let genesis = Block::create_genesis();
        state.chain_store.save_block(&genesis);
        core.chain.push(genesis);
    } else {
        state.chain_store.replace_chain(&core.chain);
    }

    core.known_hashes = core.chain.iter().map(|b| b.hash.clone()).collect();
    tracing::info!(height = core.chain.len() - 1, "chain initialized");
}

/// Scans seed peers for a longer valid chain and, best-effort, copies the
/// source peer's pending mempool alongside it.
fn fetch_longer_chain_from_seeds(state: &AppState) -> Option<(Vec<Block>, Vec<chain::SignedTransaction>)> {
    let reward = state.chain_cfg.mining_reward();
    let mut best: Option<(Vec<Block>, Peer)> = None;

    for peer in &state.seed_peers {
        let Ok(fetched) = state.net.fetch_chain(peer) else { continue };
        if fetched.is_empty() || validate_chain(&fetched, reward).is_err() {
            continue;
        }
        if best.as_ref().map(|(b, _)| b.len() < fetched.len()).unwrap_or(true) {
            best = Some((fetched, peer.clone()));
        }
    }

    let (chain, source) = best?;
    let mempool = state.net.fetch_pending(&source).unwrap_or_default();
    tracing::info!(height = chain.len() - 1, host = %source.host, port = source.port, "adopted chain from seed peer at startup");
    Some((chain, mempool))
}

/// Runs the rest of the startup sequence: spawns the bootstrap peer-discovery
/// task if seeds were given, starts the miner if this node is a miner, and
/// kicks off graph-manager self-registration.
pub fn start_background_tasks(state: SharedState) {
    if !state.seed_peers.is_empty() {
        let bootstrap_state = state.clone();
        std::thread::spawn(move || run_bootstrap(&bootstrap_state));
    }

    if state.role == crate::config::Role::Miner {
        start_miner(state.clone());
    }

    if state.graph_manager_url.is_some() {
        let register_state = state.clone();
        std::thread::spawn(move || register_with_graph_manager(&register_state));
    }
}

/// Discovers peers by unioning the seed peers with whatever peers each seed
/// reports, shuffling, and attempting `register_as_inbound` on each until
/// `max_bootstrap_peers` succeed (§4.7).
fn run_bootstrap(state: &AppState) {
    let mut candidates: HashSet<Peer> = state.seed_peers.iter().cloned().collect();
    for seed in &state.seed_peers {
        if let Ok(peers) = state.net.fetch_peers(seed) {
            candidates.extend(peers);
        }
    }
    candidates.retain(|p| !state.is_self_peer(p));

    let mut candidates: Vec<Peer> = candidates.into_iter().collect();
    candidates.shuffle(&mut thread_rng());

    let mut successes = 0usize;
    for peer in candidates {
        if successes >= state.chain_cfg.max_bootstrap_peers {
            break;
        }
        match state.net.register_as_inbound(&peer, &state.own) {
            Ok(()) => {
                state.peer_store.add(peer.clone());
                notify_graph_manager(state);
                successes += 1;
                tracing::info!(host = %peer.host, port = peer.port, "bootstrap: registered with peer");
            }
            Err(e) => {
                tracing::debug!(host = %peer.host, port = peer.port, error = %e, "bootstrap: peer unreachable");
            }
        }
    }
    tracing::info!(successes, "bootstrap complete");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chain::{ChainConfig, HttpNetworkClient, InMemoryChainStore, InMemoryPeerStore};
    use std::sync::atomic::AtomicBool;
    use std::sync::Mutex;

    fn test_state() -> AppState {
        AppState {
            core: Mutex::new(NodeCore::default()),
            chain_store: Box::new(InMemoryChainStore::new()),
            peer_store: Box::new(InMemoryPeerStore::new()),
            net: Box::new(HttpNetworkClient::new(std::time::Duration::from_millis(50))),
            chain_cfg: ChainConfig::default(),
            own: Peer { host: "127.0.0.1".to_string(), port: 5000 },
            public_key: "self".to_string(),
            role: crate::config::Role::Normal,
            seed_peers: Vec::new(),
            graph_manager_url: None,
            mining_enabled: AtomicBool::new(false),
            mining_stop: std::sync::Arc::new(AtomicBool::new(false)),
            mining_thread: Mutex::new(None),
            mining_lock: Mutex::new(()),
        }
    }

    #[test]
    fn initialize_chain_creates_genesis_with_no_seeds() {
        let state = test_state();
        initialize_chain(&state);
        let core = state.core.lock().unwrap();
        assert_eq!(core.chain.len(), 1);
        assert_eq!(core.chain[0].height, 0);
        assert!(core.known_hashes.contains(&core.chain[0].hash));
    }

    #[test]
    fn bootstrap_with_no_seeds_registers_nothing() {
        let state = test_state();
        run_bootstrap(&state);
        assert_eq!(state.peer_store.count(), 0);
    }
}
