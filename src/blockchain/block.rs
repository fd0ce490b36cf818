use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::{GENESIS_PREVIOUS_HASH, GENESIS_PROOF};
use crate::transaction::Transaction;

/// A sealed block. `index` is 1-based and equals the block's chain position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    /// Unix time in seconds (millisecond resolution).
    pub timestamp: f64,
    pub transactions: Vec<Transaction>,
    pub proof: u64,
    pub previous_hash: String,
}

impl Block {
    /// The first block of every chain: fixed proof and previous-hash sentinel.
    pub fn genesis() -> Self {
        Self {
            index: 1,
            timestamp: now_timestamp(),
            transactions: Vec::new(),
            proof: GENESIS_PROOF,
            previous_hash: GENESIS_PREVIOUS_HASH.to_string(),
        }
    }

    pub fn is_genesis_shaped(&self) -> bool {
        self.index == 1
            && self.proof == GENESIS_PROOF
            && self.previous_hash == GENESIS_PREVIOUS_HASH
    }

    /// SHA-256 (hex) of the block's canonical JSON form.
    pub fn hash(&self) -> String {
        let value = serde_json::to_value(self).expect("block serializes to json");
        hash_json(&value)
    }
}

pub fn now_timestamp() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

/// SHA-256 (hex) of `value` rendered with object keys sorted at every level.
pub fn hash_json(value: &Value) -> String {
    hex::encode(Sha256::digest(canonical_json(value).as_bytes()))
}

/// Compact JSON with object keys sorted by name, independent of the order
/// the map was built in. serde_json's default map already sorts, but the
/// `preserve_order` feature (turned on by any crate in the build that asks
/// for it) would make block hashes depend on insertion order; this writer
/// does not.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, val)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(val, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, json};

    fn sample() -> Block {
        Block {
            index: 2,
            timestamp: 1_700_000_000.125,
            transactions: vec![
                Transaction::new("a", "b", 10).with_signature("3044".into()),
                Transaction::new("0", "node", 1),
            ],
            proof: 35_293,
            previous_hash: "abc".into(),
        }
    }

    #[test]
    fn genesis_uses_sentinels() {
        let g = Block::genesis();
        assert!(g.is_genesis_shaped());
        assert!(g.transactions.is_empty());
        assert_eq!(g.hash().len(), 64);
    }

    #[test]
    fn hash_is_deterministic() {
        let b = sample();
        assert_eq!(b.hash(), b.hash());
        assert_eq!(b.hash(), b.clone().hash());
    }

    #[test]
    fn hash_ignores_field_insertion_order() {
        let b = sample();
        let tx = &b.transactions[0];

        // Build the same content with keys inserted in reverse order.
        let mut tx_map = Map::new();
        tx_map.insert("signature".into(), json!(tx.signature));
        tx_map.insert("recipient".into(), json!(tx.recipient));
        tx_map.insert("amount".into(), json!(tx.amount));
        tx_map.insert("sender".into(), json!(tx.sender));
        tx_map.insert("txID".into(), json!(tx.txid));
        let reward = serde_json::to_value(&b.transactions[1]).unwrap();

        let mut block_map = Map::new();
        block_map.insert("previous_hash".into(), json!(b.previous_hash));
        block_map.insert("proof".into(), json!(b.proof));
        block_map.insert(
            "transactions".into(),
            Value::Array(vec![Value::Object(tx_map), reward]),
        );
        block_map.insert("timestamp".into(), json!(b.timestamp));
        block_map.insert("index".into(), json!(b.index));

        assert_eq!(hash_json(&Value::Object(block_map)), b.hash());
    }

    #[test]
    fn hash_survives_wire_round_trip() {
        let b = sample();
        let wire = serde_json::to_string(&b).unwrap();
        let back: Block = serde_json::from_str(&wire).unwrap();
        assert_eq!(back.hash(), b.hash());
    }

    #[test]
    fn mutation_changes_hash() {
        let b = sample();
        let mut tampered = b.clone();
        tampered.transactions[0].amount += 1;
        assert_ne!(tampered.hash(), b.hash());
    }

    #[test]
    fn canonical_form_sorts_nested_keys() {
        let v = json!({"b": 1, "a": {"d": [1, {"z": 0, "y": 0}], "c": "x"}});
        assert_eq!(
            canonical_json(&v),
            r#"{"a":{"c":"x","d":[1,{"y":0,"z":0}]},"b":1}"#
        );
    }
}
