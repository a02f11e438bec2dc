//! Storage configuration (spec §6 "config includes ... storage (kind ∈
//! {inmemory, mongodb} + connection string + database)").

use std::sync::Arc;

use kodus_traits::store::{SessionStore, SnapshotStore};

use crate::persistor::{InMemoryPersistor, MongoPersistor};
use crate::session::{InMemorySessionStore, MongoSessionStore};

#[derive(Debug, Clone)]
pub enum StorageConfig {
    InMemory,
    MongoDb { uri: String, database: String },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::InMemory
    }
}

pub struct StorageHandles {
    pub snapshots: Arc<dyn SnapshotStore>,
    pub sessions: Arc<dyn SessionStore>,
}

impl StorageConfig {
    pub async fn build(&self) -> anyhow::Result<StorageHandles> {
        match self {
            StorageConfig::InMemory => Ok(StorageHandles {
                snapshots: InMemoryPersistor::new(),
                sessions: InMemorySessionStore::new(),
            }),
            StorageConfig::MongoDb { uri, database } => {
                let snapshots = Arc::new(MongoPersistor::connect(uri, database).await?);
                let sessions = Arc::new(MongoSessionStore::connect(uri, database).await?);
                Ok(StorageHandles { snapshots, sessions })
            }
        }
    }
}
