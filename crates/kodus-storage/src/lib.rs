//! Persistor, snapshot delta encoding, and session storage (spec §4.2,
//! §6 "Persisted state layout").

pub mod config;
pub mod hash;
pub mod persistor;
pub mod session;

pub use config::{StorageConfig, StorageHandles};
pub use hash::content_hash;
pub use persistor::{InMemoryPersistor, MongoPersistor, reconstruct};
pub use session::{InMemorySessionStore, MongoSessionStore};
