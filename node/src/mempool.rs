//! Mempool admission and balance accounting.

use chain::{Amount, Block, SignedTransaction, TxError};

use crate::state::NodeCore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MempoolError {
    DuplicateTransaction,
    CoinbaseExternallySubmitted,
    InsufficientBalance,
    Invalid(TxError),
}

impl std::fmt::Display for MempoolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MempoolError::DuplicateTransaction => write!(f, "duplicate_transaction"),
            MempoolError::CoinbaseExternallySubmitted => write!(f, "coinbase_externally_submitted"),
            MempoolError::InsufficientBalance => write!(f, "insufficient_balance"),
            MempoolError::Invalid(e) => write!(f, "{e}"),
        }
    }
}

/// Replays `chain` to compute `pubkey`'s settled balance.
pub fn chain_balance(chain: &[Block], pubkey: &str) -> Amount {
    let mut balance = Amount::ZERO;
    for block in chain {
        for tx in &block.txs {
            if tx.transaction.recipient == pubkey {
                balance = balance.checked_add(tx.transaction.amount).unwrap_or(balance);
            }
            if tx.transaction.sender.as_deref() == Some(pubkey) {
                balance = balance.checked_sub(tx.transaction.amount).unwrap_or(Amount::ZERO);
            }
        }
    }
    balance
}

/// Net effect of all currently-admitted mempool transactions on `pubkey`'s
/// balance (can be negative relative to the chain balance alone, which is
/// exactly what admission must guard against).
fn mempool_delta(mempool: &[SignedTransaction], pubkey: &str) -> i128 {
    let mut delta: i128 = 0;
    for tx in mempool {
        if tx.transaction.recipient == pubkey {
            delta += tx.transaction.amount.sub_units() as i128;
        }
        if tx.transaction.sender.as_deref() == Some(pubkey) {
            delta -= tx.transaction.amount.sub_units() as i128;
        }
    }
    delta
}

/// Available balance = settled chain balance + pending mempool delta.
pub fn available_balance(chain: &[Block], mempool: &[SignedTransaction], pubkey: &str) -> i128 {
    chain_balance(chain, pubkey).sub_units() as i128 + mempool_delta(mempool, pubkey)
}

/// Mempool admission (`add_transaction`): reject duplicates by signature,
/// reject externally-submitted coinbase, and reject if the sender's
/// available balance would go negative.
pub fn add_transaction(core: &mut NodeCore, signed: SignedTransaction) -> Result<(), MempoolError> {
    signed.verify().map_err(MempoolError::Invalid)?;

    if signed.transaction.is_coinbase() {
        return Err(MempoolError::CoinbaseExternallySubmitted);
    }
    if core.mempool.iter().any(|t| t.signature == signed.signature) {
        return Err(MempoolError::DuplicateTransaction);
    }

    let sender = signed.transaction.sender.as_deref().expect("non-coinbase has a sender");
    let available = available_balance(&core.chain, &core.mempool, sender);
    if available < signed.transaction.amount.sub_units() as i128 {
        return Err(MempoolError::InsufficientBalance);
    }

    core.mempool.push(signed);
    Ok(())
}

/// Removes every transaction included in `block` from `mempool` (used on
/// APPEND and on REORG adoption, per P9).
pub fn purge_mined(core: &mut NodeCore, block: &Block) {
    let signatures: std::collections::HashSet<&str> =
        block.txs.iter().map(|tx| tx.signature.as_str()).collect();
    core.mempool.retain(|tx| !signatures.contains(tx.signature.as_str()));
}

/// Removes every transaction included anywhere in `chain` from `mempool`,
/// used after adopting a whole new chain during a reorg.
pub fn purge_chain(core: &mut NodeCore, chain: &[Block]) {
    let signatures: std::collections::HashSet<&str> =
        chain.iter().flat_map(|b| b.txs.iter()).map(|tx| tx.signature.as_str()).collect();
    core.mempool.retain(|tx| !signatures.contains(tx.signature.as_str()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chain::{Amount, SignedTransaction, Transaction};
    use k256::ecdsa::SigningKey;
    use rand_core::OsRng;

    fn mined_block(recipient: &str, amount_coins: u64) -> Block {
        let mut block = Block {
            height: 1,
            prev_hash: "0".repeat(64),
            timestamp: 0,
            txs: vec![SignedTransaction::coinbase(recipient.to_string(), Amount::from_coins(amount_coins), 0)],
            nonce: 0,
            difficulty: 0,
            miner: recipient.to_string(),
            hash: String::new(),
        };
        block.hash = block.compute_hash();
        block
    }

    #[test]
    fn chain_balance_credits_coinbase() {
        let chain = vec![mined_block("alice", 50)];
        assert_eq!(chain_balance(&chain, "alice"), Amount::from_coins(50));
    }

    #[test]
    fn rejects_duplicate_signature() {
        let signing_key = SigningKey::random(&mut OsRng);
        let sender = chain::tx::public_key_hex(&signing_key);
        let chain_blocks = vec![mined_block(&sender, 100)];
        let mut core = NodeCore { chain: chain_blocks, ..Default::default() };

        let tx = Transaction::new(Some(sender.clone()), "bob".to_string(), Amount::from_coins(10), 1).unwrap();
        let signed = SignedTransaction::sign(&signing_key, tx);

        add_transaction(&mut core, signed.clone()).unwrap();
        assert_eq!(add_transaction(&mut core, signed).unwrap_err(), MempoolError::DuplicateTransaction);
    }

    #[test]
    fn rejects_when_balance_would_go_negative() {
        let signing_key = SigningKey::random(&mut OsRng);
        let sender = chain::tx::public_key_hex(&signing_key);
        let chain_blocks = vec![mined_block(&sender, 10)];
        let mut core = NodeCore { chain: chain_blocks, ..Default::default() };

        let tx = Transaction::new(Some(sender), "bob".to_string(), Amount::from_coins(50), 1).unwrap();
        let signed = SignedTransaction::sign(&signing_key, tx);

        assert_eq!(add_transaction(&mut core, signed).unwrap_err(), MempoolError::InsufficientBalance);
    }

    #[test]
    fn rejects_externally_submitted_coinbase() {
        let mut core = NodeCore::default();
        let signed = SignedTransaction::coinbase("miner".to_string(), Amount::from_coins(50), 0);
        assert_eq!(
            add_transaction(&mut core, signed).unwrap_err(),
            MempoolError::CoinbaseExternallySubmitted
        );
    }

    #[test]
    fn purge_mined_removes_included_transactions() {
        let mut core = NodeCore::default();
        let block = mined_block("alice", 50);
        core.mempool.push(block.txs[0].clone());
        purge_mined(&mut core, &block);
        assert!(core.mempool.is_empty());
    }
}
