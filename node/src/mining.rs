//! The mining thread and the synchronous `/mine` path.

use std::sync::atomic::Ordering;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chain::{mine_next_block, Block, MineOutcome};

use crate::acceptance::apply_mined_block;
use crate::state::SharedState;

fn current_unix_timestamp() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_else(|_| Duration::from_secs(0)).as_secs()
}

/// Spawns the background mining thread. Interruption sources: a block
/// append/reorg (`interrupt_miner`), the mempool crossing `mining_min`
/// upward, and `stop_mining`.
pub fn start_miner(state: SharedState) {
    state.mining_enabled.store(true, Ordering::Relaxed);
    let mut guard = state.mining_thread.lock().expect("mining thread mutex poisoned");
    if guard.is_some() {
        return;
    }
    let handle = std::thread::spawn(move || mining_loop(state));
    *guard = Some(handle);
}

pub fn stop_miner(state: &SharedState) {
    state.mining_enabled.store(false, Ordering::Relaxed);
    state.interrupt_miner();
}

pub fn is_mining(state: &SharedState) -> bool {
    state.mining_enabled.load(Ordering::Relaxed)
}

fn mining_loop(state: SharedState) {
    while state.mining_enabled.load(Ordering::Relaxed) {
        state.mining_stop.store(false, Ordering::Relaxed);

        let (tip, pending) = {
            let core = state.core.lock().expect("node core mutex poisoned");
            match core.tip() {
                Some(tip) => (tip.clone(), core.mempool.clone()),
                None => {
                    std::thread::sleep(Duration::from_millis(100));
                    continue;
                }
            }
        };

        let _lock = state.mining_lock.lock().expect("mining lock poisoned");
        let outcome = mine_next_block(
            &tip,
            &state.public_key,
            state.chain_cfg.difficulty,
            state.chain_cfg.mining_reward(),
            pending,
            current_unix_timestamp,
            &state.mining_stop,
        );
        drop(_lock);

        match outcome {
            MineOutcome::Interrupted => continue,
            MineOutcome::Found(block) => {
                apply_mined_block(&state, block);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MineError {
    NotAMiner,
    Interrupted,
    Busy,
}

/// Runs one mining round synchronously, for tests/tools. Ignores
/// `mining_enabled` but still respects `role`.
///
/// Shares `mining_lock` with the background loop (§9 open question): if
/// the background miner already holds it, this returns `Busy` immediately
/// rather than queueing behind an unbounded proof-of-work search.
pub fn mine_once(state: &SharedState) -> Result<Block, MineError> {
    if state.role != crate::config::Role::Miner {
        return Err(MineError::NotAMiner);
    }

    let _lock = match state.mining_lock.try_lock() {
        Ok(guard) => guard,
        Err(_) => return Err(MineError::Busy),
    };

    let (tip, pending) = {
        let core = state.core.lock().expect("node core mutex poisoned");
        (core.tip().cloned().unwrap_or_else(Block::create_genesis), core.mempool.clone())
    };

    state.mining_stop.store(false, Ordering::Relaxed);
    let outcome = mine_next_block(
        &tip,
        &state.public_key,
        state.chain_cfg.difficulty,
        state.chain_cfg.mining_reward(),
        pending,
        current_unix_timestamp,
        &state.mining_stop,
    );
    drop(_lock);

    match outcome {
        MineOutcome::Interrupted => Err(MineError::Interrupted),
        MineOutcome::Found(block) => {
            apply_mined_block(state, block.clone());
            Ok(block)
        }
    }
}
