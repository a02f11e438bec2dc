use async_trait::async_trait;
use dashmap::DashMap;
use kodus_contracts::Message;
use kodus_traits::store::{SessionStore, StoreResult};
use std::sync::Arc;

struct ThreadDocument {
    session_id: String,
    messages: Vec<Message>,
}

/// In-memory `SessionStore`, the default for `StorageConfig::InMemory`.
#[derive(Default)]
pub struct InMemorySessionStore {
    threads: DashMap<String, ThreadDocument>,
}

impl InMemorySessionStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn resolve_session(&self, thread_id: &str) -> StoreResult<Option<(String, String)>> {
        Ok(self
            .threads
            .get(thread_id)
            .map(|doc| (doc.session_id.clone(), thread_id.to_string())))
    }

    async fn ensure_session(&self, thread_id: &str, session_id: &str) -> StoreResult<()> {
        self.threads.entry(thread_id.to_string()).or_insert_with(|| ThreadDocument {
            session_id: session_id.to_string(),
            messages: Vec::new(),
        });
        Ok(())
    }

    async fn append_message(&self, thread_id: &str, message: Message) -> StoreResult<()> {
        let mut doc = self
            .threads
            .entry(thread_id.to_string())
            .or_insert_with(|| ThreadDocument {
                session_id: uuid::Uuid::new_v4().to_string(),
                messages: Vec::new(),
            });
        doc.messages.push(message);
        Ok(())
    }

    async fn update_message(&self, thread_id: &str, message: Message) -> StoreResult<()> {
        if let Some(mut doc) = self.threads.get_mut(thread_id) {
            if let Some(existing) = doc.messages.iter_mut().find(|m| m.id == message.id) {
                *existing = message;
            }
        }
        Ok(())
    }

    async fn messages(&self, thread_id: &str) -> StoreResult<Vec<Message>> {
        Ok(self
            .threads
            .get(thread_id)
            .map(|doc| doc.messages.clone())
            .unwrap_or_default())
    }
}
