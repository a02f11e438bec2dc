use async_trait::async_trait;
use kodus_contracts::Message;
use kodus_traits::store::{SessionStore, StoreError, StoreResult};
use mongodb::bson::doc;
use mongodb::{Client, Collection};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct ThreadDoc {
    thread_id: String,
    session_id: String,
    messages: Vec<Message>,
}

pub struct MongoSessionStore {
    threads: Collection<ThreadDoc>,
}

impl MongoSessionStore {
    pub async fn connect(uri: &str, database: &str) -> anyhow::Result<Self> {
        let client = Client::with_uri_str(uri).await?;
        let db = client.database(database);
        Ok(Self {
            threads: db.collection("threads"),
        })
    }
}

#[async_trait]
impl SessionStore for MongoSessionStore {
    async fn resolve_session(&self, thread_id: &str) -> StoreResult<Option<(String, String)>> {
        let found = self
            .threads
            .find_one(doc! { "thread_id": thread_id })
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(found.map(|t| (t.session_id, t.thread_id)))
    }

    async fn ensure_session(&self, thread_id: &str, session_id: &str) -> StoreResult<()> {
        let exists = self
            .threads
            .find_one(doc! { "thread_id": thread_id })
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?
            .is_some();
        if !exists {
            self.threads
                .insert_one(ThreadDoc {
                    thread_id: thread_id.to_string(),
                    session_id: session_id.to_string(),
                    messages: Vec::new(),
                })
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;
        }
        Ok(())
    }

    async fn append_message(&self, thread_id: &str, message: Message) -> StoreResult<()> {
        let message_bson =
            mongodb::bson::to_bson(&message).map_err(|e| StoreError::Backend(e.to_string()))?;
        self.threads
            .update_one(
                doc! { "thread_id": thread_id },
                doc! { "$push": { "messages": message_bson } },
            )
            .upsert(true)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn update_message(&self, thread_id: &str, message: Message) -> StoreResult<()> {
        let message_bson =
            mongodb::bson::to_bson(&message).map_err(|e| StoreError::Backend(e.to_string()))?;
        self.threads
            .update_one(
                doc! { "thread_id": thread_id, "messages.id": &message.id },
                doc! { "$set": { "messages.$": message_bson } },
            )
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn messages(&self, thread_id: &str) -> StoreResult<Vec<Message>> {
        let found = self
            .threads
            .find_one(doc! { "thread_id": thread_id })
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(found.map(|t| t.messages).unwrap_or_default())
    }
}
