//! ReAct strategy (spec §4.7): repeated Think→Act→Observe.
//!
//! Grounded on `restflow-ai/src/agent/react/mod.rs`'s iteration loop,
//! generalized to the spec's termination rules (stagnation, iteration cap,
//! timeout).

use super::{AgentStrategy, StrategyConfig, StrategyMetadata, StrategyResult};
use crate::error::{AgentError, AgentResult};
use crate::scratchpad::Scratchpad;
use crate::stagnation::{ActionOutcome, DefaultStagnationPolicy, IterationRecord, StagnationPolicy};
use crate::tool::ToolRegistry;
use async_trait::async_trait;
use kodus_contracts::{ExecutionContext, StepKind};
use kodus_traits::llm::{LlmAdapter, LlmCall, LlmMessage};
use std::sync::Arc;
use std::time::Instant;

pub struct ReactStrategy {
    llm: Arc<dyn LlmAdapter>,
    tools: Arc<ToolRegistry>,
    stagnation_policy: Arc<dyn StagnationPolicy>,
}

impl ReactStrategy {
    pub fn new(llm: Arc<dyn LlmAdapter>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            llm,
            tools,
            stagnation_policy: Arc::new(DefaultStagnationPolicy),
        }
    }

    pub fn with_stagnation_policy(mut self, policy: Arc<dyn StagnationPolicy>) -> Self {
        self.stagnation_policy = policy;
        self
    }
}

#[async_trait]
impl AgentStrategy for ReactStrategy {
    fn name(&self) -> &'static str {
        "react"
    }

    async fn execute(&self, ctx: &ExecutionContext, config: StrategyConfig) -> AgentResult<StrategyResult> {
        let start = Instant::now();
        let scratchpad = Scratchpad::new(3 * config.max_iterations.max(1));
        let mut history: Vec<IterationRecord> = Vec::new();

        for iteration in 0..config.max_iterations {
            if start.elapsed().as_secs() >= ctx.limits.timeout_secs {
                return Ok(stopped(iteration, "timeout"));
            }

            let mut messages = Vec::new();
            if let Some(system_prompt) = &config.system_prompt {
                messages.push(LlmMessage::system(system_prompt.clone()));
            }
            messages.push(LlmMessage::user(format!(
                "Goal: {}\nTranscript so far:\n{}",
                config.goal,
                scratchpad.render()
            )));

            let response = self
                .llm
                .call(&messages, &LlmCall::default())
                .await
                .map_err(AgentError::Other)?;

            if let Some(call) = response.tool_calls.first() {
                let action = StepKind::ToolCall {
                    tool_name: call.name.clone(),
                };
                scratchpad.append(iteration, "action", serde_json::json!({"tool": call.name, "args": call.arguments}));

                let outcome = self.tools.execute_call(&call.name, call.arguments.clone()).await;
                let (result_outcome, observation) = match &outcome {
                    Ok(value) => (ActionOutcome::Succeeded, serde_json::json!({"ok": true, "result": value})),
                    Err(err) => (ActionOutcome::Failed, serde_json::json!({"ok": false, "error": err.to_string()})),
                };
                scratchpad.append(iteration, "observation", observation);
                history.push(IterationRecord { action, outcome: result_outcome });

                if self.stagnation_policy.is_stagnant(&history) {
                    return Ok(stopped(iteration + 1, "stagnation"));
                }
                continue;
            }

            // No tool call: the model's content is treated as a final
            // answer (spec §4.7 "on `final_answer`, the loop ends").
            return Ok(StrategyResult {
                success: true,
                output: response.content,
                iterations: iteration + 1,
                strategy_metadata: StrategyMetadata::default(),
            });
        }

        Ok(stopped(config.max_iterations, "max_iterations"))
    }
}

fn stopped(iterations: usize, reason: &str) -> StrategyResult {
    StrategyResult {
        success: false,
        output: format!("stopped: {reason}"),
        iterations,
        strategy_metadata: StrategyMetadata {
            plan: None,
            stop_reason: Some(reason.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_llm::MockLlmAdapter;
    use kodus_contracts::context::{AgentIdentity, ExecutionLimits};
    use kodus_contracts::{ExecutionContext, StrategySelector};
    use kodus_traits::llm::{LlmResponse, ToolCallRequest};
    use serde_json::json;

    fn ctx() -> ExecutionContext {
        ExecutionContext::new(
            "tenant-1",
            Some("thread-1".into()),
            None,
            "session-1".into(),
            json!("do it"),
            AgentIdentity {
                name: "reviewer".into(),
                description: None,
            },
            StrategySelector::ReAct,
            ExecutionLimits::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn final_answer_ends_the_loop_immediately() {
        let llm = MockLlmAdapter::with_responses(vec![LlmResponse {
            content: "done".into(),
            tool_calls: vec![],
        }]);
        let strategy = ReactStrategy::new(Arc::new(llm), Arc::new(ToolRegistry::new()));
        let result = strategy.execute(&ctx(), StrategyConfig::new("finish")).await.unwrap();
        assert!(result.success);
        assert_eq!(result.output, "done");
        assert_eq!(result.iterations, 1);
    }

    #[tokio::test]
    async fn two_failed_tool_calls_in_a_row_trigger_stagnation_stop() {
        let tool_call = || ToolCallRequest {
            id: "1".into(),
            name: "missing_tool".into(),
            arguments: json!({}),
        };
        let llm = MockLlmAdapter::with_responses(vec![
            LlmResponse {
                content: String::new(),
                tool_calls: vec![tool_call()],
            },
            LlmResponse {
                content: String::new(),
                tool_calls: vec![tool_call()],
            },
        ]);
        let strategy = ReactStrategy::new(Arc::new(llm), Arc::new(ToolRegistry::new()));
        let result = strategy
            .execute(&ctx(), StrategyConfig::new("call a missing tool"))
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.strategy_metadata.stop_reason.as_deref(), Some("stagnation"));
    }
}
