//! Bounded set of `(host, port)` peers with most-recent-first ordering.

use std::path::Path;
use std::sync::Mutex;

use rocksdb::{ColumnFamilyDescriptor, Options, DB};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Peer {
    pub host: String,
    pub port: u16,
}

/// Operations: `add` (upsert), `remove`, `get_all` (most-recent-first),
/// `count`. Capacity bounding (`MAX_PEERS`) is the node server's policy,
/// not the store's — the store just records insertion order.
pub trait PeerStore: Send + Sync {
    fn add(&self, peer: Peer);
    fn remove(&self, peer: &Peer);
    fn get_all(&self) -> Vec<Peer>;
    fn count(&self) -> usize;
}

#[derive(Default)]
pub struct InMemoryPeerStore {
    // Most-recently-added last; `get_all` reverses on read.
    peers: Mutex<Vec<Peer>>,
}

impl InMemoryPeerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PeerStore for InMemoryPeerStore {
    fn add(&self, peer: Peer) {
        let mut peers = self.peers.lock().expect("peer store mutex poisoned");
        peers.retain(|p| p != &peer);
        peers.push(peer);
    }

    fn remove(&self, peer: &Peer) {
        self.peers.lock().expect("peer store mutex poisoned").retain(|p| p != peer);
    }

    fn get_all(&self) -> Vec<Peer> {
        let mut peers = self.peers.lock().expect("peer store mutex poisoned").clone();
        peers.reverse();
        peers
    }

    fn count(&self) -> usize {
        self.peers.lock().expect("peer store mutex poisoned").len()
    }
}

#[derive(Clone, Debug)]
pub struct RocksDbPeerConfig {
    pub path: String,
    pub create_if_missing: bool,
}

impl Default for RocksDbPeerConfig {
    fn default() -> Self {
        Self { path: "db/peers.db".to_string(), create_if_missing: true }
    }
}

/// RocksDB-backed peer set keyed by an insertion-order sequence number
/// (stored big-endian so reverse iteration gives most-recent-first), with
/// a secondary `"index"` column family mapping `host:port` to its
/// sequence number for upsert/remove.
pub struct RocksDbPeerStore {
    db: DB,
    next_seq: Mutex<u64>,
}

fn peer_key(host: &str, port: u16) -> String {
    format!("{host}:{port}")
}

impl RocksDbPeerStore {
    pub fn open(cfg: &RocksDbPeerConfig) -> Result<Self, rocksdb::Error> {
        let path = Path::new(&cfg.path);
        let mut opts = Options::default();
        opts.create_if_missing(cfg.create_if_missing);
        opts.create_missing_column_families(cfg.create_if_missing);

        let cfs = vec![
            ColumnFamilyDescriptor::new("default", Options::default()),
            ColumnFamilyDescriptor::new("peers", Options::default()),
            ColumnFamilyDescriptor::new("index", Options::default()),
        ];
        let db = DB::open_cf_descriptors(&opts, path, cfs)?;

        let cf_peers = db.cf_handle("peers").expect("'peers' column family must exist");
        let next_seq = db
            .iterator_cf(&cf_peers, rocksdb::IteratorMode::End)
            .flatten()
            .next()
            .map(|(key, _)| u64::from_be_bytes(key.as_ref().try_into().unwrap_or([0; 8])) + 1)
            .unwrap_or(0);

        Ok(Self { db, next_seq: Mutex::new(next_seq) })
    }
}

impl PeerStore for RocksDbPeerStore {
    fn add(&self, peer: Peer) {
        let cf_peers = self.db.cf_handle("peers").expect("'peers' column family must exist");
        let cf_index = self.db.cf_handle("index").expect("'index' column family must exist");
        let index_key = peer_key(&peer.host, peer.port);

        if let Ok(Some(existing)) = self.db.get_cf(&cf_index, &index_key) {
            if let Err(e) = self.db.delete_cf(&cf_peers, &existing) {
                tracing::error!(error = %e, "peer store: failed to drop stale entry on upsert");
            }
        }

        let mut next_seq = self.next_seq.lock().expect("peer store mutex poisoned");
        let seq = *next_seq;
        *next_seq += 1;
        let seq_key = seq.to_be_bytes();

        let record = serde_json::to_vec(&peer).expect("peer must serialize");
        if let Err(e) = self.db.put_cf(&cf_peers, seq_key, record) {
            tracing::error!(error = %e, "peer store: put_cf failed");
        }
        if let Err(e) = self.db.put_cf(&cf_index, &index_key, seq_key) {
            tracing::error!(error = %e, "peer store: index put_cf failed");
        }
    }

    fn remove(&self, peer: &Peer) {
        let cf_peers = self.db.cf_handle("peers").expect("'peers' column family must exist");
        let cf_index = self.db.cf_handle("index").expect("'index' column family must exist");
        let index_key = peer_key(&peer.host, peer.port);
        if let Ok(Some(seq_key)) = self.db.get_cf(&cf_index, &index_key) {
            let _ = self.db.delete_cf(&cf_peers, &seq_key);
            let _ = self.db.delete_cf(&cf_index, &index_key);
        }
    }

    fn get_all(&self) -> Vec<Peer> {
        let cf_peers = self.db.cf_handle("peers").expect("'peers' column family must exist");
        self.db
            .iterator_cf(&cf_peers, rocksdb::IteratorMode::End)
            .flatten()
            .filter_map(|(_, value)| serde_json::from_slice(&value).ok())
            .collect()
    }

    fn count(&self) -> usize {
        let cf_peers = self.db.cf_handle("peers").expect("'peers' column family must exist");
        self.db.iterator_cf(&cf_peers, rocksdb::IteratorMode::Start).flatten().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn peer(port: u16) -> Peer {
        Peer { host: "127.0.0.1".to_string(), port }
    }

    #[test]
    fn in_memory_store_returns_most_recent_first() {
        let store = InMemoryPeerStore::new();
        store.add(peer(5001));
        store.add(peer(5002));
        let all = store.get_all();
        assert_eq!(all, vec![peer(5002), peer(5001)]);
    }

    #[test]
    fn in_memory_store_upsert_moves_peer_to_front() {
        let store = InMemoryPeerStore::new();
        store.add(peer(5001));
        store.add(peer(5002));
        store.add(peer(5001));
        assert_eq!(store.get_all(), vec![peer(5001), peer(5002)]);
    }

    #[test]
    fn rocksdb_store_roundtrips_and_orders_most_recent_first() {
        let tmp = TempDir::new().expect("create temp dir");
        let cfg = RocksDbPeerConfig { path: tmp.path().to_string_lossy().to_string(), create_if_missing: true };
        let store = RocksDbPeerStore::open(&cfg).expect("open RocksDB");

        store.add(peer(5001));
        store.add(peer(5002));
        assert_eq!(store.count(), 2);
        assert_eq!(store.get_all(), vec![peer(5002), peer(5001)]);

        store.remove(&peer(5001));
        assert_eq!(store.get_all(), vec![peer(5002)]);
    }
}
