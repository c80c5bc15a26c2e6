//! Canonical hashing: `H(record)` over sorted-key, compact JSON.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Length in hex characters of an `H()` digest (SHA-256 = 32 bytes = 64 hex chars).
pub const HASH_HEX_LEN: usize = 64;

/// All-zero hash, used as the genesis block's `prev_hash`.
pub fn zero_hash() -> String {
    "0".repeat(HASH_HEX_LEN)
}

/// Hashes `record` after canonicalizing it: recursively sorted map keys
/// (free, since `serde_json::Map` is a `BTreeMap` by default), compact
/// separators, and exact decimal number formatting via
/// `serde_json`'s arbitrary-precision numbers so no value is rounded
/// through an `f64` on its way to the digest.
///
/// Returns 64 lowercase hex characters.
pub fn canonical_hash<T: Serialize>(record: &T) -> String {
    let value = serde_json::to_value(record).expect("record must serialize to JSON");
    let canonical = serde_json::to_string(&value).expect("canonical JSON must serialize");
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sorts_keys_regardless_of_insertion_order() {
        let a = json!({"b": 1, "a": 2});
        let b = json!({"a": 2, "b": 1});
        assert_eq!(canonical_hash(&a), canonical_hash(&b));
    }

    #[test]
    fn digest_is_64_lowercase_hex_chars() {
        let h = canonical_hash(&json!({"x": "y"}));
        assert_eq!(h.len(), HASH_HEX_LEN);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn different_content_hashes_differ() {
        assert_ne!(canonical_hash(&json!({"a": 1})), canonical_hash(&json!({"a": 2})));
    }

    #[test]
    fn zero_hash_has_expected_shape() {
        let z = zero_hash();
        assert_eq!(z.len(), HASH_HEX_LEN);
        assert!(z.chars().all(|c| c == '0'));
    }
}
