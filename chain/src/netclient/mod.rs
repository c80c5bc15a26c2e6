//! Synchronous network client for peer membership and block/tx gossip.

pub mod http;

pub use http::HttpNetworkClient;

use crate::block::Block;
use crate::storage::peer_store::Peer;
use crate::tx::SignedTransaction;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetError {
    Unreachable,
    ProtocolRejected(u16),
}

impl std::fmt::Display for NetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NetError::Unreachable => write!(f, "unreachable"),
            NetError::ProtocolRejected(code) => write!(f, "protocol_rejected({code})"),
        }
    }
}

impl std::error::Error for NetError {}

/// The client owns no state; concurrency is the caller's responsibility.
pub trait NetworkClient: Send + Sync {
    fn register_as_inbound(&self, peer: &Peer, own: &Peer) -> Result<(), NetError>;
    fn fetch_peers(&self, peer: &Peer) -> Result<Vec<Peer>, NetError>;
    fn ping(&self, peer: &Peer) -> Result<(), NetError>;
    fn submit_block(&self, peer: &Peer, block: &Block) -> Result<(), NetError>;
    fn fetch_chain(&self, peer: &Peer) -> Result<Vec<Block>, NetError>;
    fn fetch_pending(&self, peer: &Peer) -> Result<Vec<SignedTransaction>, NetError>;
    fn submit_transaction(&self, peer: &Peer, tx: &SignedTransaction) -> Result<(), NetError>;

    /// Iterates `peers`, logging the success ratio; non-fatal on partial failure.
    fn broadcast_block(&self, peers: &[Peer], block: &Block) {
        let mut ok = 0usize;
        for peer in peers {
            match self.submit_block(peer, block) {
                Ok(()) => ok += 1,
                Err(e) => tracing::debug!(host = %peer.host, port = peer.port, error = %e, "broadcast_block: peer failed"),
            }
        }
        tracing::info!(height = block.height, succeeded = ok, total = peers.len(), "broadcast_block complete");
    }

    fn broadcast_transaction(&self, peers: &[Peer], tx: &SignedTransaction) {
        let mut ok = 0usize;
        for peer in peers {
            match self.submit_transaction(peer, tx) {
                Ok(()) => ok += 1,
                Err(e) => tracing::debug!(host = %peer.host, port = peer.port, error = %e, "broadcast_transaction: peer failed"),
            }
        }
        tracing::info!(succeeded = ok, total = peers.len(), "broadcast_transaction complete");
    }
}
