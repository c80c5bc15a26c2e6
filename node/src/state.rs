//! Process-wide node state: chain, mempool, orphan pool, peers, and the
//! mining handle, serialized behind a single coarse lock (§5: "a single
//! coarse lock per node is acceptable given load characteristics").

use std::collections::{HashMap, HashSet};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use chain::{Block, ChainConfig, ChainStore, NetworkClient, Peer, PeerStore, SignedTransaction};

use crate::config::Role;

/// Everything the acceptance state machine, the mempool, and the mining
/// loop read and mutate together. Kept as one struct so (a) chain
/// extension and mempool purge, and (b) orphan-flush vs. replace-chain,
/// are always observed together by holding the single lock around both.
#[derive(Default)]
pub struct NodeCore {
    pub chain: Vec<Block>,
    pub known_hashes: HashSet<String>,
    pub mempool: Vec<SignedTransaction>,
    /// Blocks buffered by `prev_hash`, newest push last.
    pub orphans: HashMap<String, Vec<Block>>,
}

impl NodeCore {
    pub fn tip(&self) -> Option<&Block> {
        self.chain.last()
    }
}

pub struct AppState {
    pub core: Mutex<NodeCore>,
    pub chain_store: Box<dyn ChainStore>,
    pub peer_store: Box<dyn PeerStore>,
    pub net: Box<dyn NetworkClient>,
    pub chain_cfg: ChainConfig,
    pub own: Peer,
    pub public_key: String,
    pub role: Role,
    pub seed_peers: Vec<Peer>,
    pub graph_manager_url: Option<String>,
    pub mining_enabled: AtomicBool,
    /// Set whenever the tip changes (append, reorg) or `stop_mining` is
    /// called, so an in-flight `mine_next_block` restarts or exits promptly.
    pub mining_stop: Arc<AtomicBool>,
    pub mining_thread: Mutex<Option<JoinHandle<()>>>,
    /// Held for the duration of a mining attempt so a synchronous `/mine`
    /// call and the background miner never race (§9 open question).
    pub mining_lock: Mutex<()>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn is_self_peer(&self, peer: &Peer) -> bool {
        peer.host == self.own.host && peer.port == self.own.port
    }

    pub fn interrupt_miner(&self) {
        self.mining_stop.store(true, std::sync::atomic::Ordering::Relaxed);
    }
}
