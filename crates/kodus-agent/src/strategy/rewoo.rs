//! ReWOO strategy (spec §4.7): plan entirely up front, then execute steps
//! in dependency order with placeholder resolution.
//!
//! Grounded on `restflow-ai/src/agent/rewoo/executor.rs`'s plan-then-run
//! split and its `resolveArgs` placeholder substitution.

use super::{AgentStrategy, StrategyConfig, StrategyMetadata, StrategyResult};
use crate::error::{AgentError, AgentResult};
use crate::tool::ToolRegistry;
use async_trait::async_trait;
use kodus_contracts::{ExecutionContext, Plan, Step, StepKind, StepStatus};
use kodus_traits::llm::LlmAdapter;
use serde_json::Value;
use std::sync::Arc;

pub struct RewooStrategy {
    llm: Arc<dyn LlmAdapter>,
    tools: Arc<ToolRegistry>,
}

impl RewooStrategy {
    pub fn new(llm: Arc<dyn LlmAdapter>, tools: Arc<ToolRegistry>) -> Self {
        Self { llm, tools }
    }

    async fn execute_plan(&self, plan: &mut Plan) -> AgentResult<()> {
        plan.status = kodus_contracts::PlanStatus::Executing;

        let step_ids: Vec<String> = plan.steps.iter().map(|s| s.id.clone()).collect();
        for step_id in step_ids {
            let depends_on = plan.step(&step_id).map(|s| s.depends_on.clone()).unwrap_or_default();
            if depends_on.iter().any(|dep| {
                plan.step(dep)
                    .map(|s| !matches!(s.status, StepStatus::Succeeded))
                    .unwrap_or(true)
            }) {
                if let Some(step) = plan.step_mut(&step_id) {
                    step.status = StepStatus::Skipped;
                }
                continue;
            }

            let resolved_inputs = match resolve_args(plan, &step_id) {
                Ok(inputs) => inputs,
                Err(err) => {
                    if let Some(step) = plan.step_mut(&step_id) {
                        step.status = StepStatus::Failed;
                        step.result = Some(Value::String(err.to_string()));
                    }
                    plan.status = kodus_contracts::PlanStatus::Failed;
                    return Err(err);
                }
            };

            let kind = plan.step(&step_id).map(|s| s.kind.clone());
            let outcome = match kind {
                Some(StepKind::ToolCall { tool_name }) => {
                    if let Some(step) = plan.step_mut(&step_id) {
                        step.status = StepStatus::Running;
                    }
                    self.tools.execute_call(&tool_name, resolved_inputs).await
                }
                Some(StepKind::FinalAnswer) | Some(StepKind::NeedMoreInfo { .. }) => Ok(resolved_inputs),
                Some(StepKind::Delegate { .. }) | Some(StepKind::ExecutePlan { .. }) | None => {
                    Ok(Value::Null)
                }
            };

            if let Some(step) = plan.step_mut(&step_id) {
                match outcome {
                    Ok(value) => {
                        step.status = StepStatus::Succeeded;
                        step.result = Some(value);
                    }
                    Err(err) => {
                        step.status = StepStatus::Failed;
                        step.result = Some(Value::String(err.to_string()));
                    }
                }
            }
        }

        plan.status = if plan.steps.iter().any(|s| s.status == StepStatus::Failed) {
            kodus_contracts::PlanStatus::Failed
        } else {
            kodus_contracts::PlanStatus::Completed
        };
        Ok(())
    }
}

/// `resolveArgs(rawArgs, executedSteps, ctx)`: substitutes `${stepId}`
/// placeholders in a step's string inputs with the referenced step's
/// result. A step that references a dependency not yet succeeded fails
/// with `AgentError::UnresolvedPlaceholder`.
fn resolve_args(plan: &Plan, step_id: &str) -> AgentResult<Value> {
    let Some(step) = plan.step(step_id) else {
        return Ok(Value::Null);
    };
    resolve_value(plan, step, &step.inputs)
}

fn resolve_value(plan: &Plan, step: &Step, value: &Value) -> AgentResult<Value> {
    match value {
        Value::String(text) => {
            if let Some(placeholder) = text.strip_prefix("${").and_then(|rest| rest.strip_suffix('}')) {
                let Some(referenced) = plan.step(placeholder) else {
                    return Err(AgentError::UnresolvedPlaceholder {
                        step_id: step.id.clone(),
                        placeholder: placeholder.to_string(),
                    });
                };
                return referenced.result.clone().ok_or_else(|| AgentError::UnresolvedPlaceholder {
                    step_id: step.id.clone(),
                    placeholder: placeholder.to_string(),
                });
            }
            Ok(value.clone())
        }
        Value::Object(obj) => {
            let mut resolved = serde_json::Map::new();
            for (key, nested) in obj {
                resolved.insert(key.clone(), resolve_value(plan, step, nested)?);
            }
            Ok(Value::Object(resolved))
        }
        Value::Array(items) => {
            let mut resolved = Vec::with_capacity(items.len());
            for item in items {
                resolved.push(resolve_value(plan, step, item)?);
            }
            Ok(Value::Array(resolved))
        }
        other => Ok(other.clone()),
    }
}

#[async_trait]
impl AgentStrategy for RewooStrategy {
    fn name(&self) -> &'static str {
        "rewoo"
    }

    async fn execute(&self, ctx: &ExecutionContext, config: StrategyConfig) -> AgentResult<StrategyResult> {
        let plan = self
            .llm
            .create_plan(&config.goal, "rewoo", &Value::Object(config.context.clone().into_iter().collect()))
            .await
            .map_err(AgentError::Other)?;

        let Some(mut plan) = plan else {
            return Err(AgentError::PlannerFailure(
                "rewoo strategy requires an adapter that implements create_plan".to_string(),
            ));
        };

        let _ = ctx;
        self.execute_plan(&mut plan).await?;

        let succeeded = matches!(plan.status, kodus_contracts::PlanStatus::Completed);
        let final_output = plan
            .steps
            .iter()
            .rev()
            .find_map(|s| s.result.clone())
            .map(|v| v.to_string())
            .unwrap_or_default();

        Ok(StrategyResult {
            success: succeeded,
            output: final_output,
            iterations: plan.steps.len(),
            strategy_metadata: StrategyMetadata {
                plan: Some(plan.steps.iter().map(|s| s.id.clone()).collect()),
                stop_reason: if succeeded { None } else { Some("plan_failed".to_string()) },
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kodus_contracts::context::{AgentIdentity, ExecutionLimits};
    use kodus_contracts::{ExecutionContext, StrategySelector};
    use kodus_traits::llm::LlmResponse;
    use serde_json::json;

    struct PlanningAdapter {
        plan: Plan,
    }

    #[async_trait]
    impl LlmAdapter for PlanningAdapter {
        async fn call(&self, _messages: &[kodus_traits::llm::LlmMessage], _options: &kodus_traits::llm::LlmCall) -> anyhow::Result<LlmResponse> {
            Ok(LlmResponse {
                content: String::new(),
                tool_calls: vec![],
            })
        }

        async fn create_plan(&self, _goal: &str, _strategy: &str, _context: &Value) -> anyhow::Result<Option<Plan>> {
            Ok(Some(self.plan.clone()))
        }
    }

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
            StrategySelector::ReWOO,
            ExecutionLimits::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn dependent_step_resolves_placeholder_from_predecessor_result() {
        let mut plan = Plan::new("p1", "summarize the repo", "rewoo");
        let first = Step::new("s1", StepKind::ToolCall { tool_name: "echo".into() }, json!({"text": "hello"}));
        let second = Step::new(
            "s2",
            StepKind::ToolCall {
                tool_name: "echo".into(),
            },
            json!({"text": "${s1}"}),
        )
        .depends_on(["s1".to_string()]);
        plan.steps.push(first);
        plan.steps.push(second);

        let registry = ToolRegistry::new();
        registry
            .register_tool(
                kodus_traits::tool::ToolDefinition {
                    name: "echo".into(),
                    description: "echo".into(),
                    input_schema: json!({}),
                    output_schema: None,
                    categories: vec![],
                    dependencies: vec![],
                    tags: vec![],
                },
                Arc::new(EchoTool),
                crate::tool::circuit_breaker::CircuitBreakerConfig::default(),
            )
            .unwrap();

        let strategy = RewooStrategy::new(Arc::new(PlanningAdapter { plan }), Arc::new(registry));
        let result = strategy.execute(&ctx(), StrategyConfig::new("summarize the repo")).await.unwrap();
        assert!(result.success);
    }

    #[tokio::test]
    async fn missing_dependency_result_fails_with_unresolved_placeholder() {
        let mut plan = Plan::new("p1", "broken", "rewoo");
        let step = Step::new("s1", StepKind::ToolCall { tool_name: "echo".into() }, json!({"text": "${ghost}"}));
        plan.steps.push(step);

        let strategy = RewooStrategy::new(Arc::new(PlanningAdapter { plan }), Arc::new(ToolRegistry::new()));
        let result = strategy.execute(&ctx(), StrategyConfig::new("broken")).await;
        assert!(matches!(result, Err(AgentError::UnresolvedPlaceholder { .. })));
    }

    struct EchoTool;

    #[async_trait]
    impl kodus_traits::tool::ToolExecutor for EchoTool {
        async fn execute(&self, input: Value) -> anyhow::Result<Value> {
            Ok(input)
        }
    }
}
