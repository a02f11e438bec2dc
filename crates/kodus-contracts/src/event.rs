//! Event envelope flowing through the Event Queue / Runtime (spec §3, §4.3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lower value wins (higher priority drains first), per spec §4.3 "Ordering".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    Critical = 0,
    High = 1,
    Normal = 2,
    Low = 3,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeliveryGuarantee {
    AtMostOnce,
    AtLeastOnce,
}

impl Default for DeliveryGuarantee {
    fn default() -> Self {
        DeliveryGuarantee::AtMostOnce
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventMetadata {
    pub correlation_id: Option<String>,
    pub tenant_id: Option<String>,
    pub operation_id: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub compressed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: Value,
    pub metadata: EventMetadata,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub delivery_guarantee: Option<DeliveryGuarantee>,
    /// Raw payload bytes when `metadata.compressed` is set (spec §4.3
    /// "Compression"). `data` still carries the pre-compression JSON view for
    /// callers that never compress; the queue only touches this field.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub compressed_payload: Option<Vec<u8>>,
}

/// Event types the kernel/runtime must recognize (spec §6 "Event taxonomy").
pub mod event_type {
    pub const KERNEL_STARTED: &str = "kernel.started";
    pub const KERNEL_COMPLETED: &str = "kernel.completed";
    pub const KERNEL_FAILED: &str = "kernel.failed";
    pub const WORKFLOW_COMPLETED: &str = "workflow.completed";
    pub const WORKFLOW_FAILED: &str = "workflow.failed";
    pub const AGENT_ACTION_START: &str = "agent.action.start";
    pub const AGENT_TOOL_COMPLETED: &str = "agent.tool.completed";
    pub const AGENT_TOOL_ERROR: &str = "agent.tool.error";
    pub const AGENT_ERROR: &str = "agent.error";

    /// Flush-critical events: these short-circuit batching (spec §4.3).
    pub const FLUSH_CRITICAL: &[&str] =
        &[KERNEL_COMPLETED, KERNEL_FAILED, WORKFLOW_COMPLETED, WORKFLOW_FAILED];
}

impl Event {
    pub fn new(event_type: impl Into<String>, data: Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event_type: event_type.into(),
            data,
            metadata: EventMetadata {
                timestamp: Some(Utc::now()),
                ..Default::default()
            },
            priority: Priority::Normal,
            delivery_guarantee: None,
            compressed_payload: None,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.metadata.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn with_delivery_guarantee(mut self, guarantee: DeliveryGuarantee) -> Self {
        self.delivery_guarantee = Some(guarantee);
        self
    }

    pub fn is_flush_critical(&self) -> bool {
        event_type::FLUSH_CRITICAL.contains(&self.event_type.as_str())
    }
}
