//! Chain library crate.
//!
//! Core building blocks for a small peer-to-peer proof-of-work
//! cryptocurrency:
//!
//! - canonical hashing (`hash`),
//! - fixed-point coin amounts (`amount`),
//! - the transaction layer (`tx`),
//! - blocks, PoW, and chain validation (`block`),
//! - storage backends for the chain and the peer set (`storage`),
//! - a synchronous network client (`netclient`),
//! - and design-constant configuration (`config`).
//!
//! The `node` and `graph-manager` binaries compose these pieces into the
//! process-wide orchestrator and the topology aggregator respectively.

pub mod amount;
pub mod block;
pub mod config;
pub mod hash;
pub mod netclient;
pub mod storage;
pub mod tx;

pub use amount::Amount;
pub use block::{mine_next_block, validate_chain, Block, BlockError, MineOutcome};
pub use config::ChainConfig;
pub use hash::canonical_hash;
pub use netclient::{HttpNetworkClient, NetError, NetworkClient};
pub use storage::{
    ChainStore, InMemoryChainStore, InMemoryPeerStore, Peer, PeerStore, RocksDbChainStore,
    RocksDbConfig, RocksDbPeerConfig, RocksDbPeerStore,
};
pub use tx::{SignedTransaction, Transaction, TxError};
