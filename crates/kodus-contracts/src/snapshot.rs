//! Content-addressed kernel state capture (spec §3 "Snapshot").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub execution_context_id: String,
    pub timestamp: DateTime<Utc>,
    pub state: Value,
    pub hash: String,
    /// Present only for delta snapshots: the hash of the full snapshot this
    /// one patches against.
    pub base_hash: Option<String>,
    /// Present only for delta snapshots: a JSON Merge Patch (RFC 7396)
    /// against the base snapshot's state.
    pub patch: Option<Value>,
}

impl Snapshot {
    pub fn is_delta(&self) -> bool {
        self.base_hash.is_some()
    }
}
