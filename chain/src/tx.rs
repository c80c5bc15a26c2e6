//! Transaction and signed-transaction records, `txid` derivation, and
//! ECDSA-over-secp256k1 signing/verification.

use k256::ecdsa::signature::{Signer, Verifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};

use crate::amount::{Amount, AmountError};
use crate::hash::canonical_hash;

pub const COINBASE_SIGNATURE: &str = "COINBASE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxError {
    NonPositiveAmount,
    TxidMismatch,
    InvalidSignature,
    MalformedPublicKey,
}

impl std::fmt::Display for TxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            TxError::NonPositiveAmount => "non_positive_amount",
            TxError::TxidMismatch => "txid_mismatch",
            TxError::InvalidSignature => "invalid_signature",
            TxError::MalformedPublicKey => "malformed_public_key",
        };
        write!(f, "{kind}")
    }
}

impl std::error::Error for TxError {}

impl From<AmountError> for TxError {
    fn from(_: AmountError) -> Self {
        TxError::NonPositiveAmount
    }
}

/// `sender = None` denotes a coinbase (mining reward), legal only as the
/// first transaction of a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: Option<String>,
    pub recipient: String,
    pub amount: Amount,
    pub timestamp: u64,
}

/// The subset of `Transaction` fields that `txid` is a pure function of,
/// serialized in this exact shape so `H()` is stable regardless of how the
/// in-memory struct's field order is declared.
#[derive(Serialize)]
struct TxidRecord<'a> {
    sender: &'a Option<String>,
    recipient: &'a str,
    amount: Amount,
    timestamp: u64,
}

impl Transaction {
    pub fn new(
        sender: Option<String>,
        recipient: String,
        amount: Amount,
        timestamp: u64,
    ) -> Result<Self, TxError> {
        if amount.is_zero() {
            return Err(TxError::NonPositiveAmount);
        }
        Ok(Transaction { sender, recipient, amount, timestamp })
    }

    pub fn txid(&self) -> String {
        canonical_hash(&TxidRecord {
            sender: &self.sender,
            recipient: &self.recipient,
            amount: self.amount,
            timestamp: self.timestamp,
        })
    }

    pub fn is_coinbase(&self) -> bool {
        self.sender.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub signature: String,
}

impl SignedTransaction {
    pub fn txid(&self) -> String {
        self.transaction.txid()
    }

    /// Signs `tx` with `signing_key`; the resulting signature covers the
    /// UTF-8 bytes of `txid(tx)`.
    pub fn sign(signing_key: &SigningKey, tx: Transaction) -> Self {
        let txid = tx.txid();
        let signature: Signature = signing_key.sign(txid.as_bytes());
        SignedTransaction { transaction: tx, signature: hex::encode(signature.to_bytes()) }
    }

    /// Builds the coinbase transaction that must be `txs[0]` of a mined block.
    pub fn coinbase(recipient: String, reward: Amount, timestamp: u64) -> Self {
        let transaction = Transaction { sender: None, recipient, amount: reward, timestamp };
        SignedTransaction { transaction, signature: COINBASE_SIGNATURE.to_string() }
    }

    /// For coinbase: `signature == "COINBASE"` and `sender == None`.
    /// Otherwise: decode `sender` as an uncompressed secp256k1 point and
    /// verify the ECDSA-SHA256 signature over `txid`.
    pub fn verify(&self) -> Result<(), TxError> {
        match &self.transaction.sender {
            None => {
                if self.signature == COINBASE_SIGNATURE {
                    Ok(())
                } else {
                    Err(TxError::InvalidSignature)
                }
            }
            Some(sender_hex) => {
                let pub_bytes = hex::decode(sender_hex).map_err(|_| TxError::MalformedPublicKey)?;
                let verifying_key = VerifyingKey::from_sec1_bytes(&pub_bytes)
                    .map_err(|_| TxError::MalformedPublicKey)?;
                let sig_bytes = hex::decode(&self.signature).map_err(|_| TxError::InvalidSignature)?;
                let signature =
                    Signature::from_slice(&sig_bytes).map_err(|_| TxError::InvalidSignature)?;
                verifying_key
                    .verify(self.transaction.txid().as_bytes(), &signature)
                    .map_err(|_| TxError::InvalidSignature)
            }
        }
    }

    /// Validates that an embedded `txid` field, if present in the raw
    /// record, matches the recomputed txid, then verifies the signature
    /// immediately. A failing signature fails decode.
    pub fn decode(record: serde_json::Value) -> Result<Self, TxError> {
        let provided_txid = record.get("txid").and_then(|v| v.as_str()).map(str::to_string);
        let signed: SignedTransaction =
            serde_json::from_value(record).map_err(|_| TxError::TxidMismatch)?;
        if let Some(expected) = provided_txid {
            if expected != signed.txid() {
                return Err(TxError::TxidMismatch);
            }
        }
        signed.verify()?;
        Ok(signed)
    }

    /// Encodes to the wire record including the derived `txid` field, so
    /// receivers can cross-check it against the recomputed value.
    pub fn to_record(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).expect("SignedTransaction must serialize");
        if let serde_json::Value::Object(map) = &mut value {
            map.insert("txid".to_string(), serde_json::Value::String(self.txid()));
        }
        value
    }
}

pub fn public_key_hex(signing_key: &SigningKey) -> String {
    let verifying_key = VerifyingKey::from(signing_key);
    hex::encode(verifying_key.to_encoded_point(false).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::SigningKey;
    use rand_core::OsRng;

    fn dummy_tx(sender: Option<String>, amount: &str) -> Transaction {
        Transaction::new(sender, "recipient-hex".to_string(), Amount::parse_positive(amount).unwrap(), 1_700_000_000)
            .unwrap()
    }

    #[test]
    fn txid_is_pure_function_of_semantic_fields() {
        let a = dummy_tx(None, "50");
        let b = dummy_tx(None, "50");
        assert_eq!(a.txid(), b.txid());
    }

    #[test]
    fn coinbase_round_trips_through_decode() {
        let signed = SignedTransaction::coinbase("miner-pub".to_string(), Amount::from_coins(50), 0);
        let record = signed.to_record();
        let decoded = SignedTransaction::decode(record).unwrap();
        assert_eq!(decoded, signed);
    }

    #[test]
    fn sign_then_verify_succeeds() {
        let signing_key = SigningKey::random(&mut OsRng);
        let sender = public_key_hex(&signing_key);
        let tx = dummy_tx(Some(sender), "1.5");
        let signed = SignedTransaction::sign(&signing_key, tx);
        assert!(signed.verify().is_ok());
    }

    #[test]
    fn mutated_amount_invalidates_signature() {
        let signing_key = SigningKey::random(&mut OsRng);
        let sender = public_key_hex(&signing_key);
        let tx = dummy_tx(Some(sender), "1.5");
        let mut signed = SignedTransaction::sign(&signing_key, tx);
        signed.transaction.amount = Amount::parse_positive("2.5").unwrap();
        assert_eq!(signed.verify().unwrap_err(), TxError::InvalidSignature);
    }

    #[test]
    fn corrupted_signature_hex_char_fails_verify() {
        let signing_key = SigningKey::random(&mut OsRng);
        let sender = public_key_hex(&signing_key);
        let tx = dummy_tx(Some(sender), "1.5");
        let mut signed = SignedTransaction::sign(&signing_key, tx);
        let mut chars: Vec<char> = signed.signature.chars().collect();
        chars[0] = if chars[0] == 'a' { 'b' } else { 'a' };
        signed.signature = chars.into_iter().collect();
        assert!(signed.verify().is_err());
    }

    #[test]
    fn zero_amount_is_rejected_at_construction() {
        let err = Transaction::new(None, "r".to_string(), Amount::ZERO, 0).unwrap_err();
        assert_eq!(err, TxError::NonPositiveAmount);
    }
}
