use async_trait::async_trait;
use dashmap::DashMap;
use kodus_contracts::Snapshot;
use kodus_traits::store::{SnapshotStore, StoreResult};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::hash::content_hash;
use crate::persistor::diff;

/// In-memory backing for `StorageConfig::InMemory` (spec §6). Durable for
/// the lifetime of the process only; `append` is still "durable once it
/// returns" within that lifetime, matching spec §4.2.
#[derive(Default)]
pub struct InMemoryPersistor {
    by_hash: DashMap<String, Snapshot>,
    /// Insertion order, used to find "the latest full snapshot" for delta
    /// encoding without scanning timestamps.
    order: DashMap<usize, String>,
    cursor: AtomicUsize,
}

impl InMemoryPersistor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn latest_full_hash(&self) -> Option<String> {
        let len = self.cursor.load(Ordering::SeqCst);
        for idx in (0..len).rev() {
            if let Some(hash) = self.order.get(&idx) {
                if let Some(snap) = self.by_hash.get(hash.value()) {
                    if !snap.is_delta() {
                        return Some(hash.value().clone());
                    }
                }
            }
        }
        None
    }

    fn record(&self, snapshot: Snapshot) {
        let idx = self.cursor.fetch_add(1, Ordering::SeqCst);
        self.order.insert(idx, snapshot.hash.clone());
        self.by_hash.insert(snapshot.hash.clone(), snapshot);
    }
}

#[async_trait]
impl SnapshotStore for InMemoryPersistor {
    async fn append(&self, mut snapshot: Snapshot, use_delta: bool) -> StoreResult<()> {
        if snapshot.hash.is_empty() {
            snapshot.hash = content_hash(&snapshot.state);
        }

        if use_delta {
            if let Some(base_hash) = self.latest_full_hash() {
                if let Some(base) = self.by_hash.get(&base_hash) {
                    let patch = diff(&base.state, &snapshot.state);
                    snapshot.base_hash = Some(base_hash);
                    snapshot.patch = Some(patch);
                }
            }
        }

        self.record(snapshot);
        Ok(())
    }

    async fn get_by_hash(&self, hash: &str) -> StoreResult<Option<Snapshot>> {
        Ok(self.by_hash.get(hash).map(|entry| entry.value().clone()))
    }

    async fn cleanup_old_snapshots(&self, keep_latest: usize) -> StoreResult<usize> {
        let len = self.cursor.load(Ordering::SeqCst);
        if len <= keep_latest {
            return Ok(0);
        }
        let drop_count = len - keep_latest;
        let mut removed = 0;
        for idx in 0..drop_count {
            if let Some((_, hash)) = self.order.remove(&idx) {
                if self.by_hash.remove(&hash).is_some() {
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn snap(state: serde_json::Value) -> Snapshot {
        Snapshot {
            execution_context_id: "exec-1".into(),
            timestamp: Utc::now(),
            hash: content_hash(&state),
            state,
            base_hash: None,
            patch: None,
        }
    }

    #[tokio::test]
    async fn round_trips_by_hash() {
        let store = InMemoryPersistor::new();
        let s = snap(json!({"a": 1}));
        let hash = s.hash.clone();
        store.append(s.clone(), false).await.unwrap();
        let fetched = store.get_by_hash(&hash).await.unwrap().unwrap();
        assert_eq!(fetched.state, s.state);
        assert_eq!(fetched.hash, s.hash);
    }

    #[tokio::test]
    async fn delta_snapshot_references_latest_base() {
        let store = InMemoryPersistor::new();
        let base = snap(json!({"a": 1, "b": 1}));
        let base_hash = base.hash.clone();
        store.append(base, false).await.unwrap();

        let mut next = snap(json!({"a": 1, "b": 2}));
        next.hash = "delta-1".into();
        store.append(next, true).await.unwrap();

        let fetched = store.get_by_hash("delta-1").await.unwrap().unwrap();
        assert!(fetched.is_delta());
        assert_eq!(fetched.base_hash.unwrap(), base_hash);
        assert_eq!(fetched.patch.unwrap(), json!({"b": 2}));
    }
}
