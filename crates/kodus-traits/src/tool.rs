//! Tool execution contract (spec §4.8, §6 "Tool schema").

use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub output_schema: Option<Value>,
    pub categories: Vec<String>,
    pub dependencies: Vec<String>,
    pub tags: Vec<String>,
}

/// A tool's execution behavior, decoupled from the registry that holds it.
/// `kodus-agent::tools::Tool` wraps this with schema metadata.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, input: Value) -> anyhow::Result<Value>;
}
