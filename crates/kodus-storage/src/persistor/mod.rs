//! Persistor (spec §4.2): append-only snapshot store with content hashing,
//! optional delta encoding, and retrieval by hash.

mod in_memory;
mod mongo;

pub use in_memory::InMemoryPersistor;
pub use mongo::MongoPersistor;

use kodus_contracts::Snapshot;
use kodus_traits::store::{StoreError, StoreResult};

/// Computes the JSON Merge Patch-shaped delta stored alongside a delta
/// snapshot. We only need a flat, reversible diff of top-level+nested keys
/// that changed; full RFC 7396 semantics (null-means-delete) are enough for
/// reconstruction because `apply_patch` below is its exact inverse.
pub(crate) fn diff(base: &serde_json::Value, next: &serde_json::Value) -> serde_json::Value {
    use serde_json::Value;
    match (base, next) {
        (Value::Object(base_map), Value::Object(next_map)) => {
            let mut patch = serde_json::Map::new();
            for (k, v) in next_map {
                match base_map.get(k) {
                    Some(existing) if existing == v => {}
                    Some(existing) => {
                        patch.insert(k.clone(), diff(existing, v));
                    }
                    None => {
                        patch.insert(k.clone(), v.clone());
                    }
                }
            }
            for k in base_map.keys() {
                if !next_map.contains_key(k) {
                    patch.insert(k.clone(), Value::Null);
                }
            }
            Value::Object(patch)
        }
        _ => next.clone(),
    }
}

pub(crate) fn apply_patch(base: &serde_json::Value, patch: &serde_json::Value) -> serde_json::Value {
    use serde_json::Value;
    match (base, patch) {
        (Value::Object(base_map), Value::Object(patch_map)) => {
            let mut result = base_map.clone();
            for (k, v) in patch_map {
                if v.is_null() {
                    result.remove(k);
                } else if let Some(existing) = result.get(k) {
                    let merged = apply_patch(existing, v);
                    result.insert(k.clone(), merged);
                } else {
                    result.insert(k.clone(), v.clone());
                }
            }
            Value::Object(result)
        }
        _ => patch.clone(),
    }
}

/// Reconstructs a full snapshot by walking back through a delta chain to
/// its base. `resolve` is called with each `base_hash` encountered.
pub async fn reconstruct<F, Fut>(snapshot: Snapshot, mut resolve: F) -> StoreResult<Snapshot>
where
    F: FnMut(String) -> Fut,
    Fut: std::future::Future<Output = StoreResult<Option<Snapshot>>>,
{
    if !snapshot.is_delta() {
        return Ok(snapshot);
    }
    let mut patches = vec![snapshot.patch.clone().unwrap_or(serde_json::Value::Null)];
    let mut cursor = snapshot.base_hash.clone();
    let mut base: Option<Snapshot> = None;
    while let Some(hash) = cursor.take() {
        let found = resolve(hash.clone())
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("base snapshot {hash} missing")))?;
        if found.is_delta() {
            patches.push(found.patch.clone().unwrap_or(serde_json::Value::Null));
            cursor = found.base_hash.clone();
        } else {
            base = Some(found);
        }
    }
    let base = base.ok_or_else(|| StoreError::Backend("delta chain never reached a base".into()))?;
    let mut state = base.state;
    for patch in patches.into_iter().rev() {
        state = apply_patch(&state, &patch);
    }
    Ok(Snapshot {
        execution_context_id: snapshot.execution_context_id,
        timestamp: snapshot.timestamp,
        hash: snapshot.hash,
        state,
        base_hash: None,
        patch: None,
    })
}
