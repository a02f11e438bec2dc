//! Strategy Runtime (C7), Tool Engine + Circuit Breaker (C8), and Agent Core
//! (C9). Analogous to the teacher's `restflow-ai` crate.

pub mod config;
pub mod core;
pub mod error;
pub mod scratchpad;
pub mod stagnation;
pub mod strategy;
pub mod tool;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock_llm;

pub use config::{LogLevel, ObservabilitySettings, OrchestratorConfig};
pub use core::{AgentCore, AgentDefinition, CallAgentResult, CancellationToken, InvocationOptions};
pub use error::{AgentError, AgentResult, ToolErrorKind, classify_tool_error};
pub use scratchpad::{Scratchpad, ScratchpadEntry};
pub use stagnation::{ActionOutcome, DefaultStagnationPolicy, IterationRecord, StagnationPolicy};
pub use strategy::{AgentStrategy, StrategyConfig, StrategyMetadata, StrategyResult, synthesize_final_response};
pub use strategy::plan_execute::PlanExecuteStrategy;
pub use strategy::react::ReactStrategy;
pub use strategy::rewoo::RewooStrategy;
pub use tool::ToolRegistry;
pub use tool::aggregation::{AggregationOutcome, AggregationSummary, IndividualResult, MergePolicy, aggregate};
pub use tool::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use tool::wrapper::{LoggingWrapper, RateLimitWrapper, TimeoutWrapper, ToolWrapper, WrappedTool};
