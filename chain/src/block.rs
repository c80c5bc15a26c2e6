//! Blocks, the PoW predicate, and single-block / full-chain validation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::hash::{canonical_hash, zero_hash};
use crate::tx::{SignedTransaction, TxError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockError {
    PrevHashMismatch,
    HeightMismatch,
    HashMismatch,
    PowFailure,
    TxValidationFailed(TxError),
    BalanceUnderflow,
    MissingCoinbase,
    CoinbaseShapeInvalid,
    MissingParent,
}

impl std::fmt::Display for BlockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlockError::PrevHashMismatch => write!(f, "prev_hash_mismatch"),
            BlockError::HeightMismatch => write!(f, "height_mismatch"),
            BlockError::HashMismatch => write!(f, "hash_mismatch"),
            BlockError::PowFailure => write!(f, "pow_failure"),
            BlockError::TxValidationFailed(e) => write!(f, "tx_validation_failed: {e}"),
            BlockError::BalanceUnderflow => write!(f, "balance_underflow"),
            BlockError::MissingCoinbase => write!(f, "missing_coinbase"),
            BlockError::CoinbaseShapeInvalid => write!(f, "coinbase_shape_invalid"),
            BlockError::MissingParent => write!(f, "missing_parent"),
        }
    }
}

impl std::error::Error for BlockError {}

impl From<TxError> for BlockError {
    fn from(e: TxError) -> Self {
        BlockError::TxValidationFailed(e)
    }
}

/// All fields of `Block` except `hash` — the header `H()` is computed over.
#[derive(Serialize)]
struct Header<'a> {
    height: u64,
    prev_hash: &'a str,
    timestamp: u64,
    txs: &'a [SignedTransaction],
    nonce: u64,
    difficulty: u32,
    miner: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub height: u64,
    pub prev_hash: String,
    pub timestamp: u64,
    pub txs: Vec<SignedTransaction>,
    pub nonce: u64,
    pub difficulty: u32,
    pub miner: String,
    pub hash: String,
}

impl Block {
    fn header(&self) -> Header<'_> {
        Header {
            height: self.height,
            prev_hash: &self.prev_hash,
            timestamp: self.timestamp,
            txs: &self.txs,
            nonce: self.nonce,
            difficulty: self.difficulty,
            miner: &self.miner,
        }
    }

    pub fn compute_hash(&self) -> String {
        canonical_hash(&self.header())
    }

    /// `hash.starts_with("0" * difficulty)`.
    pub fn satisfies_pow(&self) -> bool {
        let need = self.difficulty as usize;
        self.hash.len() >= need && self.hash.as_bytes()[..need].iter().all(|&b| b == b'0')
    }

    pub fn create_genesis() -> Self {
        let mut block = Block {
            height: 0,
            prev_hash: zero_hash(),
            timestamp: 0,
            txs: Vec::new(),
            nonce: 0,
            difficulty: 0,
            miner: "genesis".to_string(),
            hash: String::new(),
        };
        block.hash = block.compute_hash();
        block
    }

    /// Validates `self` against `prev` (`None` only for genesis).
    /// Non-genesis blocks must also satisfy the coinbase shape rules (I4)
    /// and every non-coinbase signature (I5); running-balance checks are
    /// left to [`validate_chain`], which has the context of the whole
    /// replay.
    pub fn validate(&self, prev: Option<&Block>, reward: Amount) -> Result<(), BlockError> {
        if self.hash != self.compute_hash() {
            return Err(BlockError::HashMismatch);
        }
        if self.height == 0 {
            if self.prev_hash != zero_hash() {
                return Err(BlockError::PrevHashMismatch);
            }
            return Ok(());
        }
        let prev = prev.ok_or(BlockError::MissingParent)?;
        if self.height != prev.height + 1 {
            return Err(BlockError::HeightMismatch);
        }
        if self.prev_hash != prev.hash {
            return Err(BlockError::PrevHashMismatch);
        }
        if !self.satisfies_pow() {
            return Err(BlockError::PowFailure);
        }
        validate_coinbase_and_signatures(&self.txs, &self.miner, reward)?;
        Ok(())
    }
}

fn validate_coinbase_and_signatures(
    txs: &[SignedTransaction],
    miner: &str,
    reward: Amount,
) -> Result<(), BlockError> {
    let first = txs.first().ok_or(BlockError::MissingCoinbase)?;
    if !first.transaction.is_coinbase()
        || first.transaction.recipient != miner
        || first.transaction.amount != reward
    {
        return Err(BlockError::CoinbaseShapeInvalid);
    }
    first.verify()?;
    for tx in &txs[1..] {
        if tx.transaction.is_coinbase() {
            return Err(BlockError::CoinbaseShapeInvalid);
        }
        tx.verify()?;
    }
    Ok(())
}

/// Walks `chain` left to right, validating each block against its
/// predecessor and maintaining a running balance map to enforce I6.
/// Returns the index of the first failing block, if any.
pub fn validate_chain(chain: &[Block], reward: Amount) -> Result<(), (usize, BlockError)> {
    let mut balances: HashMap<String, Amount> = HashMap::new();
    let mut prev: Option<&Block> = None;
    for (i, block) in chain.iter().enumerate() {
        if let Err(e) = block.validate(prev, reward) {
            return Err((i, e));
        }
        for tx in &block.txs {
            if let Some(sender) = &tx.transaction.sender {
                let balance = balances.get(sender).copied().unwrap_or(Amount::ZERO);
                let new_balance = balance
                    .checked_sub(tx.transaction.amount)
                    .ok_or((i, BlockError::BalanceUnderflow))?;
                balances.insert(sender.clone(), new_balance);
            }
            let credit = balances.get(&tx.transaction.recipient).copied().unwrap_or(Amount::ZERO);
            balances.insert(
                tx.transaction.recipient.clone(),
                credit.checked_add(tx.transaction.amount).ok_or((i, BlockError::BalanceUnderflow))?,
            );
        }
        prev = Some(block);
    }
    Ok(())
}

/// Result of an interruptible mining attempt.
pub enum MineOutcome {
    Found(Block),
    Interrupted,
}

/// Mines the next block on top of `prev`, paying `reward` to `miner_id`,
/// including `pending_txs` after the coinbase. Checks `stop_signal` once
/// per nonce attempt so callers can cancel promptly (P10).
pub fn mine_next_block(
    prev: &Block,
    miner_id: &str,
    difficulty: u32,
    reward: Amount,
    pending_txs: Vec<SignedTransaction>,
    timestamp_fn: impl Fn() -> u64,
    stop_signal: &AtomicBool,
) -> MineOutcome {
    let mut txs = Vec::with_capacity(pending_txs.len() + 1);
    txs.push(SignedTransaction::coinbase(miner_id.to_string(), reward, timestamp_fn()));
    txs.extend(pending_txs);

    let mut block = Block {
        height: prev.height + 1,
        prev_hash: prev.hash.clone(),
        timestamp: timestamp_fn(),
        txs,
        nonce: 0,
        difficulty,
        miner: miner_id.to_string(),
        hash: String::new(),
    };

    loop {
        if stop_signal.load(Ordering::Relaxed) {
            return MineOutcome::Interrupted;
        }
        block.timestamp = timestamp_fn();
        block.hash = block.compute_hash();
        if block.satisfies_pow() {
            return MineOutcome::Found(block);
        }
        block.nonce += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reward() -> Amount {
        Amount::from_coins(50)
    }

    #[test]
    fn genesis_hash_is_deterministic() {
        let a = Block::create_genesis();
        let b = Block::create_genesis();
        assert_eq!(a.hash, b.hash);
        assert_eq!(a.hash, a.compute_hash());
    }

    #[test]
    fn genesis_validates_against_no_predecessor() {
        let genesis = Block::create_genesis();
        assert!(genesis.validate(None, reward()).is_ok());
    }

    #[test]
    fn mine_next_block_satisfies_pow_and_links_to_prev() {
        let prev = Block::create_genesis();
        let stop = AtomicBool::new(false);
        let outcome = mine_next_block(&prev, "miner", 1, reward(), Vec::new(), || 0, &stop);
        let MineOutcome::Found(block) = outcome else { panic!("expected Found") };
        assert!(block.satisfies_pow());
        assert_eq!(block.prev_hash, prev.hash);
        assert!(block.validate(Some(&prev), reward()).is_ok());
    }

    #[test]
    fn mine_next_block_respects_pre_set_stop_signal() {
        let prev = Block::create_genesis();
        let stop = AtomicBool::new(true);
        let outcome = mine_next_block(&prev, "miner", 20, reward(), Vec::new(), || 0, &stop);
        assert!(matches!(outcome, MineOutcome::Interrupted));
    }

    #[test]
    fn tampered_hash_fails_validation() {
        let mut genesis = Block::create_genesis();
        genesis.hash = "f".repeat(64);
        assert_eq!(genesis.validate(None, reward()).unwrap_err(), BlockError::HashMismatch);
    }

    #[test]
    fn wrong_height_fails_validation() {
        let prev = Block::create_genesis();
        let stop = AtomicBool::new(false);
        let MineOutcome::Found(mut block) =
            mine_next_block(&prev, "miner", 1, reward(), Vec::new(), || 0, &stop)
        else {
            panic!()
        };
        block.height = 5;
        block.hash = block.compute_hash();
        assert_eq!(
            block.validate(Some(&prev), reward()).unwrap_err(),
            BlockError::HeightMismatch
        );
    }

    #[test]
    fn validate_chain_rejects_negative_balance() {
        use crate::tx::SignedTransaction;
        use k256::ecdsa::SigningKey;
        use rand_core::OsRng;

        let genesis = Block::create_genesis();
        let signing_key = SigningKey::random(&mut OsRng);
        let sender = crate::tx::public_key_hex(&signing_key);

        let stop = AtomicBool::new(false);
        let tx = crate::tx::Transaction::new(
            Some(sender),
            "someone-else".to_string(),
            Amount::from_coins(1_000),
            1,
        )
        .unwrap();
        let signed = SignedTransaction::sign(&signing_key, tx);
        let MineOutcome::Found(block) =
            mine_next_block(&genesis, "miner", 1, reward(), vec![signed], || 0, &stop)
        else {
            panic!()
        };

        let err = validate_chain(&[genesis, block], reward()).unwrap_err();
        assert_eq!(err.1, BlockError::BalanceUnderflow);
    }
}
