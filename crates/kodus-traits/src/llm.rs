//! LLM adapter contract (spec §6 "LLM Adapter contract").

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmRole {
    User,
    Assistant,
    System,
    Tool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmMessage {
    pub role: LlmRole,
    pub content: String,
}

impl LlmMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: LlmRole::User,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: LlmRole::System,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmCall {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub max_reasoning_tokens: Option<u32>,
    pub stop_sequences: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolCallRequest>,
}

/// An LLM adapter (spec §6). `create_plan` and `supports_structured_generation`
/// are optional capabilities — a default implementation returns `None`/`false`
/// so adapters that don't support planning still satisfy the trait.
#[async_trait]
pub trait LlmAdapter: Send + Sync {
    async fn call(&self, messages: &[LlmMessage], options: &LlmCall) -> anyhow::Result<LlmResponse>;

    /// Optional: produce a full upfront plan for ReWOO/Plan-Execute. `None`
    /// means the adapter does not implement planning (spec §4.7 "a probe,
    /// its absence is not an error").
    async fn create_plan(
        &self,
        _goal: &str,
        _strategy: &str,
        _context: &Value,
    ) -> anyhow::Result<Option<kodus_contracts::Plan>> {
        Ok(None)
    }

    fn supports_structured_generation(&self) -> bool {
        false
    }
}
