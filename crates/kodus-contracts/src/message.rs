//! Thread messages (spec §3 "Message").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
}

/// Status of an assistant placeholder message as it is mutated in place.
///
/// Mirrors the `processing -> completed | error` transition of spec §4.9:
/// the placeholder is mutated exactly once to `Completed` or twice to
/// `Error` (first set to `Processing`, never reordered).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Processing,
    Completed,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub tool_call_id: Option<String>,
    pub name: Option<String>,
    pub status: Option<MessageStatus>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
            tool_call_id: None,
            name: None,
            status: None,
        }
    }

    pub fn placeholder_assistant() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: Role::Assistant,
            content: "Processing your request...".to_string(),
            timestamp: Utc::now(),
            tool_call_id: None,
            name: None,
            status: Some(MessageStatus::Processing),
        }
    }

    pub fn tool(content: impl Into<String>, tool_call_id: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: Role::Tool,
            content: content.into(),
            timestamp: Utc::now(),
            tool_call_id: Some(tool_call_id.into()),
            name: None,
            status: None,
        }
    }
}
