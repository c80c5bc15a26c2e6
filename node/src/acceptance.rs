//! Block-acceptance state machine (§4.7): decode, dedupe, extend-main-chain,
//! attach-to-ancestor-as-orphan, unknown-parent-buffer, and longer-chain
//! adoption attempts.

use chain::{validate_chain, Block, BlockError};

use crate::graph_client::notify_graph_manager;
use crate::mempool;
use crate::state::{AppState, NodeCore, SharedState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcceptOutcome {
    Appended,
    Reorganized,
    Buffered,
    Rejected(String),
    Duplicate,
    Malformed,
}

fn insert_orphan(core: &mut NodeCore, cfg_per_parent: usize, cfg_total: usize, block: Block) {
    let bucket = core.orphans.entry(block.prev_hash.clone()).or_default();
    bucket.push(block);
    if bucket.len() > cfg_per_parent {
        bucket.remove(0);
    }
    let total: usize = core.orphans.values().map(|v| v.len()).sum();
    if total > cfg_total {
        // Evict oldest from the largest bucket first.
        if let Some((_, bucket)) = core.orphans.iter_mut().max_by_key(|(_, v)| v.len()) {
            if !bucket.is_empty() {
                bucket.remove(0);
            }
        }
    }
}

/// Deterministic tie-break for siblings sharing a parent: smallest hash wins.
fn pick_best_orphan(candidates: &[Block]) -> &Block {
    candidates.iter().min_by(|a, b| a.hash.cmp(&b.hash)).expect("non-empty orphan bucket")
}

/// Iteratively flushes any orphans that now extend the tip, applying the
/// smallest-hash tie-break when siblings share a parent.
fn flush_orphans(state: &AppState, core: &mut NodeCore) {
    loop {
        let Some(tip_hash) = core.tip().map(|b| b.hash.clone()) else { break };
        let Some(candidates) = core.orphans.remove(&tip_hash) else { break };
        if candidates.is_empty() {
            continue;
        }
        let winner = pick_best_orphan(&candidates).clone();
        let reward = state.chain_cfg.mining_reward();
        let prev = core.tip().cloned();
        if winner.validate(prev.as_ref(), reward).is_ok() {
            apply_append(state, core, winner);
        } else {
            break;
        }
    }
}

fn apply_append(state: &AppState, core: &mut NodeCore, block: Block) {
    core.chain.push(block.clone());
    core.known_hashes.insert(block.hash.clone());
    mempool::purge_mined(core, &block);
    state.chain_store.save_block(&block);
    state.interrupt_miner();
    notify_graph_manager(state);
    flush_orphans(state, core);
}

/// Applies a block the local mining thread (or synchronous `/mine`) just
/// found: appends it via the same acceptance path a peer's block would
/// take (which already broadcasts and notifies the graph manager).
pub fn apply_mined_block(state: &SharedState, block: Block) {
    let mut core = state.core.lock().expect("node core mutex poisoned");
    accept_block(state, &mut core, block);
}

/// REORG via `try_adopt_longer_chain`: fetches every candidate peer's
/// chain, picks the longest one ≥ `min_target`, full-chain validates it,
/// and atomically replaces the local chain on success.
pub fn try_adopt_longer_chain(state: &AppState, core: &mut NodeCore, min_target: u64) -> bool {
    let mut candidate_peers = state.seed_peers.clone();
    candidate_peers.extend(state.peer_store.get_all());

    let reward = state.chain_cfg.mining_reward();
    let mut best: Option<Vec<Block>> = None;

    for peer in &candidate_peers {
        let Ok(fetched) = state.net.fetch_chain(peer) else { continue };
        if (fetched.len() as u64) < min_target {
            continue;
        }
        if validate_chain(&fetched, reward).is_err() {
            continue;
        }
        if best.as_ref().map(|b| b.len() < fetched.len()).unwrap_or(true) {
            best = Some(fetched);
        }
    }

    let Some(new_chain) = best else { return false };

    core.chain = new_chain.clone();
    core.known_hashes = new_chain.iter().map(|b| b.hash.clone()).collect();
    mempool::purge_chain(core, &new_chain);
    state.chain_store.replace_chain(&new_chain);
    state.interrupt_miner();
    notify_graph_manager(state);
    flush_orphans(state, core);
    tracing::info!(new_length = new_chain.len(), "adopted longer chain via reorg");
    true
}

/// Runs the S0–S5 block-acceptance state machine for an incoming block.
pub fn accept_block(state: &AppState, core: &mut NodeCore, block: Block) -> AcceptOutcome {
    // S1: duplicate.
    if core.known_hashes.contains(&block.hash) {
        return AcceptOutcome::Duplicate;
    }

    let reward = state.chain_cfg.mining_reward();
    let tip = core.tip().cloned();

    // S2: does it extend the main chain? Single-block failure is rejected
    // outright; a block that passes single-block validation but fails only
    // the full-chain replay falls through to S3's per-parent orphan buffer
    // instead (it will keep failing the same check and never flush, but
    // that is an orphan-cap concern, not grounds for immediate rejection).
    let extends_tip = tip.as_ref().map(|t| block.prev_hash == t.hash).unwrap_or(block.height == 0);
    if extends_tip {
        if block.validate(tip.as_ref(), reward).is_err() {
            return AcceptOutcome::Rejected(BlockError::HashMismatch.to_string());
        }
        let mut extended = core.chain.clone();
        extended.push(block.clone());
        if validate_chain(&extended, reward).is_ok() {
            apply_append(state, core, block);
            state.net.broadcast_block(&state.peer_store.get_all(), core.tip().expect("just appended"));
            return AcceptOutcome::Appended;
        }
    }

    let tip_height = tip.as_ref().map(|b| b.height).unwrap_or(0);

    // S3: attaches to a known ancestor (not the tip) — validate in isolation.
    if core.known_hashes.contains(&block.prev_hash) {
        let parent = core.chain.iter().find(|b| b.hash == block.prev_hash).cloned();
        if block.validate(parent.as_ref(), reward).is_ok() {
            insert_orphan(core, state.chain_cfg.max_orphans_per_parent, state.chain_cfg.max_orphans_total, block.clone());
            if block.height > tip_height {
                if try_adopt_longer_chain(state, core, block.height + 1) {
                    return AcceptOutcome::Reorganized;
                }
            }
            return AcceptOutcome::Buffered;
        }
        return AcceptOutcome::Rejected(BlockError::HashMismatch.to_string());
    }

    // S4: unknown parent — speculative buffering.
    if block.hash != block.compute_hash() {
        return AcceptOutcome::Malformed;
    }
    insert_orphan(core, state.chain_cfg.max_orphans_per_parent, state.chain_cfg.max_orphans_total, block.clone());

    // S5: optionally attempt adoption if it claims enough height.
    if block.height >= tip_height + 1 && try_adopt_longer_chain(state, core, block.height + 1) {
        return AcceptOutcome::Reorganized;
    }
    AcceptOutcome::Buffered
}

#[cfg(test)]
mod tests {
    use super::*;
    use chain::{mine_next_block, Amount, ChainConfig, HttpNetworkClient, InMemoryChainStore, InMemoryPeerStore, Peer};
    use std::sync::atomic::AtomicBool;
    use std::sync::Mutex;

    fn test_state() -> AppState {
        AppState {
            core: Mutex::new(NodeCore::default()),
            chain_store: Box::new(InMemoryChainStore::new()),
            peer_store: Box::new(InMemoryPeerStore::new()),
            net: Box::new(HttpNetworkClient::new(std::time::Duration::from_millis(50))),
            chain_cfg: ChainConfig { difficulty: 1, ..ChainConfig::default() },
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
    fn genesis_then_mined_block_appends() {
        let state = test_state();
        let mut core = NodeCore::default();
        let genesis = Block::create_genesis();
        core.chain.push(genesis.clone());
        core.known_hashes.insert(genesis.hash.clone());

        let stop = AtomicBool::new(false);
        let mined = match mine_next_block(&genesis, "miner", 1, Amount::from_coins(50), Vec::new(), || 0, &stop) {
            chain::MineOutcome::Found(b) => b,
            _ => panic!(),
        };

        let outcome = accept_block(&state, &mut core, mined);
        assert_eq!(outcome, AcceptOutcome::Appended);
        assert_eq!(core.chain.len(), 2);
    }

    #[test]
    fn duplicate_block_is_rejected_as_duplicate() {
        let state = test_state();
        let mut core = NodeCore::default();
        let genesis = Block::create_genesis();
        core.chain.push(genesis.clone());
        core.known_hashes.insert(genesis.hash.clone());

        assert_eq!(accept_block(&state, &mut core, genesis), AcceptOutcome::Duplicate);
    }

    #[test]
    fn tip_extending_block_failing_only_chain_balance_check_is_buffered_not_rejected() {
        use chain::{SignedTransaction, Transaction};
        use k256::ecdsa::SigningKey;
        use rand_core::OsRng;

        let state = test_state();
        let mut core = NodeCore::default();
        let genesis = Block::create_genesis();
        core.chain.push(genesis.clone());
        core.known_hashes.insert(genesis.hash.clone());

        // A transaction spending funds its sender never received: passes
        // single-block `validate()` (coinbase shape + signatures only) but
        // fails `validate_chain`'s running-balance replay (I6).
        let attacker = SigningKey::random(&mut OsRng);
        let attacker_pub = chain::tx::public_key_hex(&attacker);
        let overspend = Transaction::new(Some(attacker_pub), "bob".to_string(), Amount::from_coins(10), 0).unwrap();
        let signed_overspend = SignedTransaction::sign(&attacker, overspend);

        let stop = AtomicBool::new(false);
        let block = match mine_next_block(
            &genesis,
            "miner",
            1,
            Amount::from_coins(50),
            vec![signed_overspend],
            || 0,
            &stop,
        ) {
            chain::MineOutcome::Found(b) => b,
            _ => panic!(),
        };

        let outcome = accept_block(&state, &mut core, block);
        assert_eq!(outcome, AcceptOutcome::Buffered);
        assert_eq!(core.chain.len(), 1, "tip must not advance past a chain-invalid block");
    }

    #[test]
    fn orphan_with_unknown_parent_is_buffered() {
        let state = test_state();
        let mut core = NodeCore::default();
        let genesis = Block::create_genesis();
        core.chain.push(genesis.clone());
        core.known_hashes.insert(genesis.hash.clone());

        let mut fake_parent = genesis.clone();
        fake_parent.height = 1;
        fake_parent.prev_hash = genesis.hash.clone();
        fake_parent.nonce = 999_999;
        fake_parent.hash = fake_parent.compute_hash();

        let mut orphan = fake_parent.clone();
        orphan.height = 2;
        orphan.prev_hash = fake_parent.hash.clone();
        orphan.hash = orphan.compute_hash();

        let outcome = accept_block(&state, &mut core, orphan);
        assert_eq!(outcome, AcceptOutcome::Buffered);
        assert_eq!(core.chain.len(), 1);
    }
}
