//! Tool Engine (spec §4.8): registry, schema validation, circuit-breaker-
//! guarded execution, and result aggregation.
//!
//! Grounded in `restflow-ai/src/tools/registry.rs` (`DashMap<String,
//! RegisteredTool>` keyed by name, duplicate-registration rejection).

pub mod aggregation;
pub mod circuit_breaker;
pub mod wrapper;

use crate::error::{AgentError, AgentResult, classify_tool_error};
use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
use dashmap::DashMap;
use kodus_traits::tool::{ToolDefinition, ToolExecutor};
use serde_json::Value;
use std::sync::Arc;

struct RegisteredTool {
    definition: ToolDefinition,
    executor: Arc<dyn ToolExecutor>,
    breaker: CircuitBreaker,
}

/// Registry of tool definitions + executors (spec §4.8).
pub struct ToolRegistry {
    tools: DashMap<String, RegisteredTool>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: DashMap::new() }
    }

    /// Unique by name; a second registration under the same name fails.
    pub fn register_tool(
        &self,
        definition: ToolDefinition,
        executor: Arc<dyn ToolExecutor>,
        breaker_config: CircuitBreakerConfig,
    ) -> AgentResult<()> {
        if self.tools.contains_key(&definition.name) {
            return Err(AgentError::DuplicateTool(definition.name));
        }
        let name = definition.name.clone();
        self.tools.insert(
            name,
            RegisteredTool {
                definition,
                executor,
                breaker: CircuitBreaker::new(breaker_config),
            },
        );
        Ok(())
    }

    pub fn list_tools(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|e| e.value().definition.clone()).collect()
    }

    /// Materializes the prompt-facing tool description (spec §4.8
    /// `getToolsForLLM`).
    pub fn get_tools_for_llm(&self) -> Vec<Value> {
        self.tools
            .iter()
            .map(|e| {
                let def = &e.value().definition;
                serde_json::json!({
                    "name": def.name,
                    "description": def.description,
                    "inputSchema": def.input_schema,
                })
            })
            .collect()
    }

    pub fn circuit_state(&self, name: &str) -> Option<CircuitState> {
        self.tools.get(name).map(|t| t.breaker.state())
    }

    /// `executeCall(name, input, options?)` (spec §4.8): validates input
    /// against the schema's `required` list, runs under the circuit
    /// breaker bounded by `operationTimeout`, classifies failures.
    pub async fn execute_call(&self, name: &str, input: Value) -> AgentResult<Value> {
        let Some(tool) = self.tools.get(name) else {
            return Err(AgentError::ToolNotFound(name.to_string()));
        };

        if let Err(message) = validate_against_schema(&tool.definition.input_schema, &input) {
            return Err(AgentError::ValidationError {
                tool: name.to_string(),
                message,
            });
        }

        if !tool.breaker.allow_call() {
            return Err(AgentError::CircuitOpen(name.to_string()));
        }

        let timeout = tool.breaker.operation_timeout();
        let result = tokio::time::timeout(timeout, tool.executor.execute(input)).await;

        match result {
            Ok(Ok(value)) => {
                tool.breaker.record_success();
                Ok(value)
            }
            Ok(Err(err)) => {
                tool.breaker.record_failure();
                let _kind = classify_tool_error(&err.to_string());
                Err(AgentError::Other(err))
            }
            Err(_) => {
                tool.breaker.record_failure();
                Err(AgentError::ToolTimeout(name.to_string()))
            }
        }
    }
}

/// Minimal JSON-Schema-shaped validation: only checks that every name in
/// `schema.required` is present in `input` when both are objects. The spec
/// names no concrete schema language beyond "JSON Schema-shaped
/// `serde_json::Value`", so this covers the one property `executeCall`
/// actually contracts on: "fails with `validation_error`" for missing
/// required fields.
fn validate_against_schema(schema: &Value, input: &Value) -> Result<(), String> {
    let Some(required) = schema.get("required").and_then(Value::as_array) else {
        return Ok(());
    };
    let Some(input_obj) = input.as_object() else {
        return Err("input is not an object".to_string());
    };
    for field in required {
        let Some(field_name) = field.as_str() else { continue };
        if !input_obj.contains_key(field_name) {
            return Err(format!("missing required field `{field_name}`"));
        }
    }
    Ok(())
}
