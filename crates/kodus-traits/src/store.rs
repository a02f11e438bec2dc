//! Persistence boundary contracts (spec §3 "Snapshot", §6 "Persisted state
//! layout", Agent Core session-consistency rule in §4.9).

use async_trait::async_trait;
use kodus_contracts::{Message, Snapshot};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("persistence error: {0}")]
    Backend(String),
    #[error("not found: {0}")]
    NotFound(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Append-only snapshot store (spec §4.2 "Persistor").
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn append(&self, snapshot: Snapshot, use_delta: bool) -> StoreResult<()>;
    async fn get_by_hash(&self, hash: &str) -> StoreResult<Option<Snapshot>>;
    async fn cleanup_old_snapshots(&self, keep_latest: usize) -> StoreResult<usize> {
        let _ = keep_latest;
        Ok(0)
    }
}

/// Thread document store presented to the Agent Core (spec §6 "a thread
/// document stores (messages, state, execution, entities, metadata)").
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns `(session_id, thread_id)` if a session already exists for
    /// this thread.
    async fn resolve_session(&self, thread_id: &str) -> StoreResult<Option<(String, String)>>;
    async fn ensure_session(&self, thread_id: &str, session_id: &str) -> StoreResult<()>;
    async fn append_message(&self, thread_id: &str, message: Message) -> StoreResult<()>;
    async fn update_message(&self, thread_id: &str, message: Message) -> StoreResult<()>;
    async fn messages(&self, thread_id: &str) -> StoreResult<Vec<Message>>;
}
