//! Append-only ordered block storage with atomic whole-chain replacement.

use std::path::Path;
use std::sync::Arc;

use rocksdb::{BoundColumnFamily, ColumnFamilyDescriptor, Options, WriteBatch, DB};

use crate::block::Block;

/// Operations: `save_block` (idempotent insert by height), `replace_chain`
/// (atomic, all-or-nothing), `load_chain`, `get_last_block`.
pub trait ChainStore: Send + Sync {
    fn save_block(&self, block: &Block);
    fn replace_chain(&self, chain: &[Block]);
    fn load_chain(&self) -> Vec<Block>;
    fn get_last_block(&self) -> Option<Block>;
}

/// In-memory store used by tests and the synchronous-mining code paths
/// that don't need persistence.
#[derive(Default)]
pub struct InMemoryChainStore {
    blocks: std::sync::Mutex<Vec<Block>>,
}

impl InMemoryChainStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChainStore for InMemoryChainStore {
    fn save_block(&self, block: &Block) {
        let mut blocks = self.blocks.lock().expect("chain store mutex poisoned");
        if blocks.iter().any(|b| b.height == block.height) {
            return;
        }
        blocks.push(block.clone());
    }

    fn replace_chain(&self, chain: &[Block]) {
        let mut blocks = self.blocks.lock().expect("chain store mutex poisoned");
        *blocks = chain.to_vec();
    }

    fn load_chain(&self) -> Vec<Block> {
        self.blocks.lock().expect("chain store mutex poisoned").clone()
    }

    fn get_last_block(&self) -> Option<Block> {
        self.blocks.lock().expect("chain store mutex poisoned").last().cloned()
    }
}

#[derive(Clone, Debug)]
pub struct RocksDbConfig {
    pub path: String,
    pub create_if_missing: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self { path: "db/chain.db".to_string(), create_if_missing: true }
    }
}

/// RocksDB-backed implementation keyed by big-endian height under a
/// `"blocks"` column family, so `load_chain` can iterate in height order
/// directly; a `"meta"` column family tracks the chain length.
pub struct RocksDbChainStore {
    db: DB,
}

fn height_key(height: u64) -> [u8; 8] {
    height.to_be_bytes()
}

impl RocksDbChainStore {
    pub fn open(cfg: &RocksDbConfig) -> Result<Self, rocksdb::Error> {
        let path = Path::new(&cfg.path);
        let mut opts = Options::default();
        opts.create_if_missing(cfg.create_if_missing);
        opts.create_missing_column_families(cfg.create_if_missing);

        let cfs = vec![
            ColumnFamilyDescriptor::new("default", Options::default()),
            ColumnFamilyDescriptor::new("blocks", Options::default()),
            ColumnFamilyDescriptor::new("meta", Options::default()),
        ];
        let db = DB::open_cf_descriptors(&opts, path, cfs)?;
        Ok(Self { db })
    }

    fn cf_blocks(&self) -> Arc<BoundColumnFamily<'_>> {
        self.db.cf_handle("blocks").expect("'blocks' column family must exist")
    }

    fn cf_meta(&self) -> Arc<BoundColumnFamily<'_>> {
        self.db.cf_handle("meta").expect("'meta' column family must exist")
    }

    fn encode(block: &Block) -> Vec<u8> {
        serde_json::to_vec(block).expect("block must serialize")
    }

    fn decode(bytes: &[u8]) -> Option<Block> {
        serde_json::from_slice(bytes).ok()
    }
}

impl ChainStore for RocksDbChainStore {
    fn save_block(&self, block: &Block) {
        let cf = self.cf_blocks();
        let key = height_key(block.height);
        if matches!(self.db.get_cf(&cf, key), Ok(Some(_))) {
            return;
        }
        if let Err(e) = self.db.put_cf(&cf, key, Self::encode(block)) {
            tracing::error!(error = %e, height = block.height, "save_block failed");
        }
    }

    /// Applies the clear-and-rewrite as a single `WriteBatch` so concurrent
    /// readers observe either the old chain or the new one, never a mix.
    fn replace_chain(&self, chain: &[Block]) {
        let cf_blocks = self.cf_blocks();
        let cf_meta = self.cf_meta();

        let mut batch = WriteBatch::default();
        let iter = self.db.iterator_cf(&cf_blocks, rocksdb::IteratorMode::Start);
        for item in iter.flatten() {
            batch.delete_cf(&cf_blocks, item.0);
        }
        for block in chain {
            batch.put_cf(&cf_blocks, height_key(block.height), Self::encode(block));
        }
        batch.put_cf(&cf_meta, b"length", (chain.len() as u64).to_be_bytes());

        if let Err(e) = self.db.write(batch) {
            tracing::error!(error = %e, "replace_chain failed");
        }
    }

    fn load_chain(&self) -> Vec<Block> {
        let cf = self.cf_blocks();
        self.db
            .iterator_cf(&cf, rocksdb::IteratorMode::Start)
            .flatten()
            .filter_map(|(_, value)| Self::decode(&value))
            .collect()
    }

    fn get_last_block(&self) -> Option<Block> {
        let cf = self.cf_blocks();
        self.db
            .iterator_cf(&cf, rocksdb::IteratorMode::End)
            .flatten()
            .next()
            .and_then(|(_, value)| Self::decode(&value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn dummy_block(height: u64) -> Block {
        let mut block = Block {
            height,
            prev_hash: "0".repeat(64),
            timestamp: height,
            txs: Vec::new(),
            nonce: 0,
            difficulty: 0,
            miner: "genesis".to_string(),
            hash: String::new(),
        };
        block.hash = block.compute_hash();
        block
    }

    #[test]
    fn in_memory_store_roundtrips_and_dedupes_by_height() {
        let store = InMemoryChainStore::new();
        store.save_block(&dummy_block(0));
        store.save_block(&dummy_block(0));
        assert_eq!(store.load_chain().len(), 1);
        assert_eq!(store.get_last_block().unwrap().height, 0);
    }

    #[test]
    fn rocksdb_store_roundtrips_block_and_chain() {
        let tmp = TempDir::new().expect("create temp dir");
        let cfg = RocksDbConfig { path: tmp.path().to_string_lossy().to_string(), create_if_missing: true };
        let store = RocksDbChainStore::open(&cfg).expect("open RocksDB");

        store.save_block(&dummy_block(0));
        store.save_block(&dummy_block(1));

        let chain = store.load_chain();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].height, 0);
        assert_eq!(chain[1].height, 1);
        assert_eq!(store.get_last_block().unwrap().height, 1);
    }

    #[test]
    fn replace_chain_is_all_or_nothing() {
        let tmp = TempDir::new().expect("create temp dir");
        let cfg = RocksDbConfig { path: tmp.path().to_string_lossy().to_string(), create_if_missing: true };
        let store = RocksDbChainStore::open(&cfg).expect("open RocksDB");

        store.save_block(&dummy_block(0));
        let new_chain = vec![dummy_block(0), dummy_block(1), dummy_block(2)];
        store.replace_chain(&new_chain);

        let loaded = store.load_chain();
        assert_eq!(loaded.len(), 3);
    }
}
