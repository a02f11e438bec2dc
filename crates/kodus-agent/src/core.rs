//! Agent Core (spec §4.9): session/thread consistency, message persistence,
//! execution-context assembly, and strategy wiring.
//!
//! Grounded in `restflow-ai/src/orchestrator/mod.rs::call_agent`'s placeholder-
//! message lifecycle and session-resolution steps.

use crate::error::AgentError;
use crate::strategy::plan_execute::PlanExecuteStrategy;
use crate::strategy::react::ReactStrategy;
use crate::strategy::rewoo::RewooStrategy;
use crate::strategy::{AgentStrategy, StrategyConfig, synthesize_final_response};
use crate::tool::ToolRegistry;
use kodus_contracts::context::{AgentIdentity, ExecutionLimits, StrategySelector};
use kodus_contracts::message::{Message, MessageStatus};
use kodus_contracts::ExecutionContext;
use kodus_traits::llm::LlmAdapter;
use kodus_traits::store::SessionStore;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Cancellation signal handed to strategies. Strategies consult
/// [`CancellationToken::is_cancelled`] between iterations; nothing in this
/// crate triggers cancellation on its own, it is purely caller-facing.
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Static description of an agent: its identity, strategy choice, and the
/// tools it is allowed to call.
pub struct AgentDefinition {
    pub identity: AgentIdentity,
    pub strategy: StrategySelector,
    pub system_prompt: Option<String>,
    pub limits: ExecutionLimits,
    pub tools: Arc<ToolRegistry>,
}

#[derive(Debug, Clone, Default)]
pub struct InvocationOptions {
    pub thread_id: Option<String>,
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct CallAgentResult {
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
    pub execution_id: String,
    pub correlation_id: String,
}

pub struct AgentCore {
    llm: Arc<dyn LlmAdapter>,
    sessions: Arc<dyn SessionStore>,
    tenant_id: String,
}

impl AgentCore {
    pub fn new(llm: Arc<dyn LlmAdapter>, sessions: Arc<dyn SessionStore>, tenant_id: impl Into<String>) -> Self {
        Self {
            llm,
            sessions,
            tenant_id: tenant_id.into(),
        }
    }

    fn build_strategy(&self, selector: StrategySelector, tools: Arc<ToolRegistry>) -> Arc<dyn AgentStrategy> {
        match selector {
            StrategySelector::ReAct => Arc::new(ReactStrategy::new(self.llm.clone(), tools)),
            StrategySelector::ReWOO => Arc::new(RewooStrategy::new(self.llm.clone(), tools)),
            StrategySelector::PlanExecute => Arc::new(PlanExecuteStrategy::new(self.llm.clone(), tools)),
        }
    }

    /// `callAgent(agentDefinition, input, options)` (spec §4.9). Never
    /// returns `Err`: every failure path is folded into a
    /// `CallAgentResult{success: false, ...}` plus a rewritten placeholder
    /// message, per "callAgent always returns a structured result."
    pub async fn call_agent(
        &self,
        definition: &AgentDefinition,
        input: Value,
        options: InvocationOptions,
    ) -> CallAgentResult {
        let sanitized_for_log = kodus_telemetry::sanitize_input(&input.to_string());
        tracing::info!(tenant_id = %self.tenant_id, input = %sanitized_for_log, "agent invocation started");

        match self.call_agent_inner(definition, input, options).await {
            Ok(result) => result,
            Err(err) => CallAgentResult {
                success: false,
                output: String::new(),
                error: Some(err.to_string()),
                execution_id: Uuid::new_v4().to_string(),
                correlation_id: Uuid::new_v4().to_string(),
            },
        }
    }

    async fn call_agent_inner(
        &self,
        definition: &AgentDefinition,
        input: Value,
        options: InvocationOptions,
    ) -> Result<CallAgentResult, AgentError> {
        // 1/4. Session resolution + reconciliation (session-consistency rule).
        let lookup_thread_id = options.thread_id.clone().unwrap_or_else(|| Uuid::new_v4().to_string());
        let existing = self.sessions.resolve_session(&lookup_thread_id).await.ok().flatten();

        let (session_id, resolved_thread_id) = match existing {
            Some((session_id, thread_id)) => (session_id, Some(thread_id)),
            None => {
                let session_id = options
                    .session_id
                    .clone()
                    .unwrap_or_else(|| lookup_thread_id.clone());
                (session_id, None)
            }
        };

        let mut ctx = ExecutionContext::new(
            self.tenant_id.clone(),
            options.thread_id.clone(),
            resolved_thread_id,
            session_id.clone(),
            input.clone(),
            definition.identity.clone(),
            definition.strategy,
            definition.limits,
        )?;

        if let Err(err) = self.sessions.ensure_session(&ctx.thread_id, &session_id).await {
            tracing::warn!(error = %err, "session write failed; continuing execution");
        }

        // 2. Append the user message.
        let user_message = Message::user(input.to_string());
        if let Err(err) = self.sessions.append_message(&ctx.thread_id, user_message).await {
            tracing::warn!(error = %err, "failed to persist user message; continuing execution");
        }

        // 3. Append placeholder assistant message, recording its id.
        let placeholder = Message::placeholder_assistant();
        let placeholder_id = placeholder.id.clone();
        if let Err(err) = self.sessions.append_message(&ctx.thread_id, placeholder).await {
            tracing::warn!(error = %err, "failed to persist placeholder message; continuing execution");
        }
        ctx.set_metadata("placeholder_message_id", placeholder_id.clone());

        // 5. Attach tools/identity/metadata (cancellation token is caller-owned).
        let strategy = self.build_strategy(definition.strategy, definition.tools.clone());
        let config = StrategyConfig {
            system_prompt: definition.system_prompt.clone(),
            ..StrategyConfig::new(input.to_string()).with_max_iterations(definition.limits.max_iterations)
        };

        let outcome = strategy.execute(&ctx, config).await;

        let (success, output, error_message) = match &outcome {
            Ok(result) => (result.success, result.output.clone(), None),
            Err(err) => (false, String::new(), Some(err.to_string())),
        };

        let final_message = if success {
            let synthesized = synthesize_final_response(strategy.as_ref(), &ctx, outcome.as_ref().unwrap()).await;
            Message {
                id: placeholder_id.clone(),
                role: kodus_contracts::message::Role::Assistant,
                content: synthesized,
                timestamp: chrono::Utc::now(),
                tool_call_id: None,
                name: None,
                status: Some(MessageStatus::Completed),
            }
        } else {
            Message {
                id: placeholder_id.clone(),
                role: kodus_contracts::message::Role::Assistant,
                content: error_message.clone().unwrap_or_default(),
                timestamp: chrono::Utc::now(),
                tool_call_id: None,
                name: None,
                status: Some(MessageStatus::Error),
            }
        };
        if let Err(err) = self.sessions.update_message(&ctx.thread_id, final_message).await {
            tracing::warn!(error = %err, "failed to persist final placeholder content");
        }

        Ok(CallAgentResult {
            success,
            output,
            error: error_message,
            execution_id: ctx.execution_id.clone(),
            correlation_id: ctx.correlation_id.clone(),
        })
    }
}
