//! Deterministic content hashing (spec §4.2 "Hashing is deterministic").
//!
//! `serde_json::Value`'s own `Display`/serialization does not sort object
//! keys, so two semantically identical states with different insertion
//! order would hash differently. We normalize first: objects are rewritten
//! with sorted keys (recursively), numbers/bools are encoded via their
//! canonical `serde_json` text form, then the whole tree is hashed with
//! SHA-256.

use serde_json::Value;
use sha2::{Digest, Sha256};

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let mut sorted = serde_json::Map::new();
            for (k, v) in entries {
                sorted.insert(k.clone(), canonicalize(v));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Stable content hash over a JSON state payload, order-independent over
/// object keys, per spec §3 "Snapshot" and §4.2.
pub fn content_hash(state: &Value) -> String {
    let canonical = canonicalize(state);
    let bytes = serde_json::to_vec(&canonical).expect("canonical JSON always serializes");
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    hex::encode(hasher.finalize())
}

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hash_is_order_independent() {
        let a = json!({"b": 1, "a": 2});
        let b = json!({"a": 2, "b": 1});
        assert_eq!(content_hash(&a), content_hash(&b));
    }

    #[test]
    fn hash_differs_on_value_change() {
        let a = json!({"a": 1});
        let b = json!({"a": 2});
        assert_ne!(content_hash(&a), content_hash(&b));
    }

    #[test]
    fn nested_objects_are_canonicalized() {
        let a = json!({"outer": {"z": 1, "a": 2}});
        let b = json!({"outer": {"a": 2, "z": 1}});
        assert_eq!(content_hash(&a), content_hash(&b));
    }
}
