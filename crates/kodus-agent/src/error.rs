//! Error kinds for the agent crate (spec §7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("schema validation failed for tool `{tool}`: {message}")]
    ValidationError { tool: String, message: String },
    #[error("tool `{0}` is not registered")]
    ToolNotFound(String),
    #[error("duplicate tool registration: {0}")]
    DuplicateTool(String),
    #[error("circuit breaker open for tool `{0}`")]
    CircuitOpen(String),
    #[error("tool `{0}` timed out")]
    ToolTimeout(String),
    #[error("unresolvable placeholder in step `{step_id}`: {placeholder}")]
    UnresolvedPlaceholder { step_id: String, placeholder: String },
    #[error("session consistency rule violated: {0}")]
    SessionInconsistent(String),
    #[error(transparent)]
    Context(#[from] kodus_contracts::context::ContextError),
    #[error("planner failure: {0}")]
    PlannerFailure(String),
    #[error(transparent)]
    Store(#[from] kodus_traits::store::StoreError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type AgentResult<T> = Result<T, AgentError>;

/// Classifies an arbitrary error message by substring heuristic (spec
/// §4.8 `executeCall`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    Timeout,
    Network,
    Authorization,
    Validation,
    NotFound,
    ServerError,
    Unknown,
}

pub fn classify_tool_error(message: &str) -> ToolErrorKind {
    let lower = message.to_lowercase();
    if lower.contains("timeout") || lower.contains("timed out") {
        ToolErrorKind::Timeout
    } else if lower.contains("network") || lower.contains("connection") {
        ToolErrorKind::Network
    } else if lower.contains("auth") || lower.contains("forbidden") || lower.contains("unauthorized") {
        ToolErrorKind::Authorization
    } else if lower.contains("validation") || lower.contains("invalid") || lower.contains("schema") {
        ToolErrorKind::Validation
    } else if lower.contains("not_found") || lower.contains("not found") || lower.contains("404") {
        ToolErrorKind::NotFound
    } else if lower.contains("server_error") || lower.contains("500") || lower.contains("internal server") {
        ToolErrorKind::ServerError
    } else {
        ToolErrorKind::Unknown
    }
}
