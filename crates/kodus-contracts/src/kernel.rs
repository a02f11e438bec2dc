//! Kernel state shape (spec §3 "Kernel State", §4.5 state machine).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelStatus {
    Initialized,
    Running,
    Paused,
    Completed,
    Failed,
}

/// Resource quotas enforced by the kernel (spec §4.5 "Quotas").
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Quotas {
    pub max_events: Option<u64>,
    pub max_duration_secs: Option<u64>,
    pub max_memory_bytes: Option<u64>,
}

impl Default for Quotas {
    fn default() -> Self {
        Self {
            max_events: None,
            max_duration_secs: None,
            max_memory_bytes: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelState {
    pub id: String,
    pub tenant_id: String,
    pub job_id: String,
    pub context_data: HashMap<String, Value>,
    pub state_data: HashMap<String, Value>,
    pub status: KernelStatus,
    pub start_time: DateTime<Utc>,
    pub event_count: u64,
    pub quotas: Quotas,
    pub last_operation_hash: Option<String>,
    pub pending_operations: HashSet<String>,
}

impl KernelState {
    pub fn new(id: impl Into<String>, tenant_id: impl Into<String>, job_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tenant_id: tenant_id.into(),
            job_id: job_id.into(),
            context_data: HashMap::new(),
            state_data: HashMap::new(),
            status: KernelStatus::Initialized,
            start_time: Utc::now(),
            event_count: 0,
            quotas: Quotas::default(),
            last_operation_hash: None,
            pending_operations: HashSet::new(),
        }
    }
}
