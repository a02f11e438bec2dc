//! Plan-Execute strategy (spec §4.7): a single top-level plan whose steps
//! may themselves be `execute_plan` actions, each delegated to a freshly
//! planned sub-plan executed by the same machinery.
//!
//! Grounded on `restflow-ai/src/agent/plan_execute/mod.rs`'s outer-loop/
//! sub-plan delegation, reusing the ReWOO step executor for the leaf work.

use super::{AgentStrategy, StrategyConfig, StrategyMetadata, StrategyResult};
use crate::error::{AgentError, AgentResult};
use crate::tool::ToolRegistry;
use async_trait::async_trait;
use kodus_contracts::{ExecutionContext, Plan, StepKind, StepStatus};
use kodus_traits::llm::LlmAdapter;
use serde_json::Value;
use std::sync::Arc;

pub struct PlanExecuteStrategy {
    llm: Arc<dyn LlmAdapter>,
    tools: Arc<ToolRegistry>,
    max_depth: usize,
}

impl PlanExecuteStrategy {
    pub fn new(llm: Arc<dyn LlmAdapter>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            llm,
            tools,
            max_depth: 5,
        }
    }

    async fn run_plan(&self, plan: &mut Plan, depth: usize) -> AgentResult<()> {
        if depth > self.max_depth {
            return Err(AgentError::PlannerFailure(format!(
                "sub-plan nesting exceeded max depth {}",
                self.max_depth
            )));
        }

        plan.status = kodus_contracts::PlanStatus::Executing;
        let step_ids: Vec<String> = plan.steps.iter().map(|s| s.id.clone()).collect();

        for step_id in step_ids {
            let ready = plan
                .step(&step_id)
                .map(|s| {
                    s.depends_on.iter().all(|dep| {
                        plan.step(dep)
                            .map(|d| d.status == StepStatus::Succeeded)
                            .unwrap_or(false)
                    })
                })
                .unwrap_or(true);
            if !ready {
                if let Some(step) = plan.step_mut(&step_id) {
                    step.status = StepStatus::Skipped;
                }
                continue;
            }

            let kind = plan.step(&step_id).map(|s| s.kind.clone());
            let inputs = plan.step(&step_id).map(|s| s.inputs.clone()).unwrap_or(Value::Null);

            if let Some(step) = plan.step_mut(&step_id) {
                step.status = StepStatus::Running;
            }

            let outcome: AgentResult<Value> = match kind {
                Some(StepKind::ToolCall { tool_name }) => self.tools.execute_call(&tool_name, inputs).await,
                Some(StepKind::ExecutePlan { plan_id }) => {
                    let sub_goal = inputs
                        .get("goal")
                        .and_then(Value::as_str)
                        .unwrap_or(&plan_id)
                        .to_string();
                    match self.llm.create_plan(&sub_goal, "plan_execute", &inputs).await {
                        Ok(Some(mut sub_plan)) => match Box::pin(self.run_plan(&mut sub_plan, depth + 1)).await {
                            Ok(()) => Ok(Value::String(
                                sub_plan
                                    .steps
                                    .iter()
                                    .rev()
                                    .find_map(|s| s.result.clone())
                                    .map(|v| v.to_string())
                                    .unwrap_or_default(),
                            )),
                            Err(err) => Err(err),
                        },
                        Ok(None) => Err(AgentError::PlannerFailure(format!(
                            "no sub-plan produced for nested step `{step_id}`"
                        ))),
                        Err(err) => Err(AgentError::Other(err)),
                    }
                }
                Some(StepKind::FinalAnswer) | Some(StepKind::NeedMoreInfo { .. }) => Ok(inputs),
                Some(StepKind::Delegate { .. }) | None => Ok(Value::Null),
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

#[async_trait]
impl AgentStrategy for PlanExecuteStrategy {
    fn name(&self) -> &'static str {
        "plan_execute"
    }

    async fn execute(&self, ctx: &ExecutionContext, config: StrategyConfig) -> AgentResult<StrategyResult> {
        let _ = ctx;
        let plan = self
            .llm
            .create_plan(
                &config.goal,
                "plan_execute",
                &Value::Object(config.context.clone().into_iter().collect()),
            )
            .await
            .map_err(AgentError::Other)?;

        let Some(mut plan) = plan else {
            return Err(AgentError::PlannerFailure(
                "plan_execute strategy requires an adapter that implements create_plan".to_string(),
            ));
        };

        self.run_plan(&mut plan, 0).await?;

        let succeeded = matches!(plan.status, kodus_contracts::PlanStatus::Completed);
        let output = plan
            .steps
            .iter()
            .rev()
            .find_map(|s| s.result.clone())
            .map(|v| v.to_string())
            .unwrap_or_default();

        Ok(StrategyResult {
            success: succeeded,
            output,
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
    use kodus_contracts::{ExecutionContext, Plan, Step, StrategySelector};
    use kodus_traits::llm::{LlmCall, LlmMessage, LlmResponse};
    use serde_json::json;

    struct NestedPlanAdapter;

    #[async_trait]
    impl LlmAdapter for NestedPlanAdapter {
        async fn call(&self, _messages: &[LlmMessage], _options: &LlmCall) -> anyhow::Result<LlmResponse> {
            Ok(LlmResponse {
                content: String::new(),
                tool_calls: vec![],
            })
        }

        async fn create_plan(&self, goal: &str, _strategy: &str, _context: &Value) -> anyhow::Result<Option<Plan>> {
            if goal == "outer" {
                let mut plan = Plan::new("outer-plan", "outer", "plan_execute");
                plan.steps.push(Step::new(
                    "delegate-1",
                    StepKind::ExecutePlan {
                        plan_id: "inner-plan".into(),
                    },
                    json!({"goal": "inner"}),
                ));
                Ok(Some(plan))
            } else {
                let mut plan = Plan::new("inner-plan", "inner", "plan_execute");
                plan.steps.push(Step::new("leaf-1", StepKind::FinalAnswer, json!("inner done")));
                Ok(Some(plan))
            }
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
            StrategySelector::PlanExecute,
            ExecutionLimits::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn nested_execute_plan_step_runs_its_sub_plan() {
        let strategy = PlanExecuteStrategy::new(Arc::new(NestedPlanAdapter), Arc::new(ToolRegistry::new()));
        let result = strategy.execute(&ctx(), StrategyConfig::new("outer")).await.unwrap();
        assert!(result.success);
        assert_eq!(result.output, "\"inner done\"");
    }

    struct NoPlanAdapter;

    #[async_trait]
    impl LlmAdapter for NoPlanAdapter {
        async fn call(&self, _messages: &[LlmMessage], _options: &LlmCall) -> anyhow::Result<LlmResponse> {
            Ok(LlmResponse {
                content: String::new(),
                tool_calls: vec![],
            })
        }
    }

    #[tokio::test]
    async fn missing_planner_support_fails_with_planner_failure() {
        let strategy = PlanExecuteStrategy::new(Arc::new(NoPlanAdapter), Arc::new(ToolRegistry::new()));
        let result = strategy.execute(&ctx(), StrategyConfig::new("outer")).await;
        assert!(matches!(result, Err(AgentError::PlannerFailure(_))));
    }
}
