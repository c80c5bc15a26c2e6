//! Chain-engine and peer-set configuration.
//!
//! `ChainConfig` aggregates the design constants the node and the graph
//! manager are built against: PoW difficulty and reward, peer-set bounds,
//! RPC timeouts, and orphan-pool limits. Higher-level binaries construct it
//! from defaults and override individual fields from CLI flags.

use std::time::Duration;

use crate::amount::Amount;

#[derive(Clone, Debug)]
pub struct ChainConfig {
    /// Number of leading hex zeros a block hash must have.
    pub difficulty: u32,
    /// Whole-coin reward paid to a block's miner via the coinbase.
    pub mining_reward_coins: u64,
    /// Mempool size threshold above which a waiting mining loop restarts early.
    pub mining_min: usize,
    /// Upper bound on the peer set's cardinality.
    pub max_peers: usize,
    /// Bootstrap stops after this many successful inbound registrations.
    pub max_bootstrap_peers: usize,
    /// Per-call timeout for intra-cluster RPCs (peers, blocks, mempool pull).
    pub rpc_timeout: Duration,
    /// Timeout for registering with the graph manager.
    pub register_node_timeout: Duration,
    /// Timeout for the fire-and-forget `/notify` call.
    pub notify_timeout: Duration,
    /// Per-parent-hash cap on buffered orphan blocks.
    pub max_orphans_per_parent: usize,
    /// Global cap across all orphan parents.
    pub max_orphans_total: usize,
}

impl Default for ChainConfig {
    fn default() -> Self {
        ChainConfig {
            difficulty: 5,
            mining_reward_coins: 50,
            mining_min: 1,
            max_peers: 5,
            max_bootstrap_peers: 3,
            rpc_timeout: Duration::from_secs(5),
            register_node_timeout: Duration::from_secs(10),
            notify_timeout: Duration::from_secs(1),
            max_orphans_per_parent: 8,
            max_orphans_total: 256,
        }
    }
}

impl ChainConfig {
    pub fn mining_reward(&self) -> Amount {
        Amount::from_coins(self.mining_reward_coins)
    }
}
