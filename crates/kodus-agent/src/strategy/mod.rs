//! Strategy Runtime (spec §4.7): ReAct, ReWOO, and Plan-Execute variants
//! over a shared `AgentStrategy` trait.
//!
//! Grounded verbatim on `restflow-ai/src/agent/strategy/traits.rs`'s
//! `StrategyConfig`/`StrategyResult`/`AgentStrategy` shape.

pub mod plan_execute;
pub mod react;
pub mod rewoo;

use crate::error::AgentResult;
use async_trait::async_trait;
use kodus_contracts::ExecutionContext;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct StrategyConfig {
    pub goal: String,
    pub system_prompt: Option<String>,
    pub max_iterations: usize,
    pub tool_timeout: Duration,
    pub context: HashMap<String, Value>,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            goal: String::new(),
            system_prompt: None,
            max_iterations: 25,
            tool_timeout: Duration::from_secs(300),
            context: HashMap::new(),
        }
    }
}

impl StrategyConfig {
    pub fn new(goal: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            ..Default::default()
        }
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct StrategyMetadata {
    pub plan: Option<Vec<String>>,
    pub stop_reason: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct StrategyResult {
    pub success: bool,
    pub output: String,
    pub iterations: usize,
    pub strategy_metadata: StrategyMetadata,
}

/// The capability set every strategy variant implements (spec §4.7).
#[async_trait]
pub trait AgentStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn execute(&self, ctx: &ExecutionContext, config: StrategyConfig) -> AgentResult<StrategyResult>;

    /// Optional planner capability probe (spec §4.7 "its absence is not an
    /// error"). Default: no synthesis, raw output is used as-is.
    async fn create_final_response(&self, _ctx: &ExecutionContext, result: &StrategyResult) -> Option<String> {
        let _ = result;
        None
    }
}

/// Runs `create_final_response`, falling back to the strategy's raw output
/// on absence or failure (spec §4.7 "Final-response synthesis").
pub async fn synthesize_final_response(
    strategy: &dyn AgentStrategy,
    ctx: &ExecutionContext,
    result: &StrategyResult,
) -> String {
    match strategy.create_final_response(ctx, result).await {
        Some(synthesized) => synthesized,
        None => result.output.clone(),
    }
}
