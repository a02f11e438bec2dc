//! Per-invocation execution context (spec §3 "Execution Context").

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::message::Message;

/// Which planner/strategy variant an invocation should run under (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategySelector {
    ReAct,
    ReWOO,
    PlanExecute,
}

/// Identity of the agent handling this invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentIdentity {
    pub name: String,
    pub description: Option<String>,
}

/// Numeric limits on a single invocation, independent of any one strategy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExecutionLimits {
    pub max_iterations: usize,
    pub timeout_secs: u64,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            max_iterations: 25,
            timeout_secs: 300,
        }
    }
}

/// Error raised when the invariants in spec §3 ("Execution Context") are
/// violated while assembling a context.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("threadId must be non-empty")]
    EmptyThreadId,
    #[error(
        "threadId mismatch: externally supplied `{supplied}` does not match kernel-resolved `{resolved}`"
    )]
    ThreadIdMismatch { supplied: String, resolved: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub execution_id: String,
    pub correlation_id: String,
    pub tenant_id: String,
    pub thread_id: String,
    pub session_id: String,
    pub input: Value,
    pub prior_messages: Vec<Message>,
    pub agent: AgentIdentity,
    pub strategy: StrategySelector,
    pub limits: ExecutionLimits,
    /// Mutable bag; carries the placeholder assistant message id among
    /// other transient keys. Kept as a plain map (not a typed struct) because
    /// its contents are an extension point for strategies/tools.
    pub metadata: HashMap<String, Value>,
}

impl ExecutionContext {
    /// Build a context, enforcing the thread-id invariants of spec §3.
    ///
    /// `external_thread_id` is what the caller supplied (if any);
    /// `resolved_thread_id` is what the session store resolved. They must
    /// agree when both are present.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tenant_id: impl Into<String>,
        external_thread_id: Option<String>,
        resolved_thread_id: Option<String>,
        session_id: String,
        input: Value,
        agent: AgentIdentity,
        strategy: StrategySelector,
        limits: ExecutionLimits,
    ) -> Result<Self, ContextError> {
        let thread_id = match (external_thread_id, resolved_thread_id) {
            (Some(a), Some(b)) if a == b => a,
            (Some(a), Some(b)) => {
                return Err(ContextError::ThreadIdMismatch {
                    supplied: a,
                    resolved: b,
                });
            }
            (Some(a), None) => a,
            (None, Some(b)) => b,
            (None, None) => return Err(ContextError::EmptyThreadId),
        };
        if thread_id.is_empty() {
            return Err(ContextError::EmptyThreadId);
        }

        Ok(Self {
            execution_id: uuid::Uuid::new_v4().to_string(),
            correlation_id: uuid::Uuid::new_v4().to_string(),
            tenant_id: tenant_id.into(),
            thread_id,
            session_id,
            input,
            prior_messages: Vec::new(),
            agent,
            strategy,
            limits,
            metadata: HashMap::new(),
        })
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.metadata.insert(key.into(), value.into());
    }

    pub fn placeholder_message_id(&self) -> Option<&str> {
        self.metadata.get("placeholder_message_id").and_then(|v| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> AgentIdentity {
        AgentIdentity {
            name: "reviewer".into(),
            description: None,
        }
    }

    #[test]
    fn rejects_empty_thread_id() {
        let err = ExecutionContext::new(
            "tenant-a",
            None,
            None,
            "session-1".into(),
            Value::Null,
            identity(),
            StrategySelector::ReAct,
            ExecutionLimits::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ContextError::EmptyThreadId));
    }

    #[test]
    fn rejects_mismatched_thread_ids() {
        let err = ExecutionContext::new(
            "tenant-a",
            Some("thread-a".into()),
            Some("thread-b".into()),
            "session-1".into(),
            Value::Null,
            identity(),
            StrategySelector::ReAct,
            ExecutionLimits::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ContextError::ThreadIdMismatch { .. }));
    }

    #[test]
    fn accepts_matching_thread_ids() {
        let ctx = ExecutionContext::new(
            "tenant-a",
            Some("thread-a".into()),
            Some("thread-a".into()),
            "session-1".into(),
            Value::Null,
            identity(),
            StrategySelector::ReAct,
            ExecutionLimits::default(),
        )
        .unwrap();
        assert_eq!(ctx.thread_id, "thread-a");
    }
}
