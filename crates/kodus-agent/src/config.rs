//! Agent Core wiring config (SPEC_FULL §D), grounded in
//! `restflow-ai/src/orchestrator/config.rs`'s adapter-handle + storage +
//! observability bundle.

use kodus_storage::StorageConfig;
use kodus_traits::llm::LlmAdapter;
use std::any::Any;
use std::sync::Arc;

/// Minimum severity a log event must meet to be emitted, independent of the
/// `tracing` subscriber a binary installs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Copy)]
pub struct ObservabilitySettings {
    pub log_level: LogLevel,
}

impl Default for ObservabilitySettings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
        }
    }
}

/// Top-level configuration an embedder builds once and shares across
/// invocations. The MCP adapter handle is kept as an opaque `Any` since the
/// core has no concrete MCP contract of its own (spec names it only as an
/// optional external collaborator).
pub struct OrchestratorConfig {
    pub llm: Arc<dyn LlmAdapter>,
    pub mcp_adapter: Option<Arc<dyn Any + Send + Sync>>,
    pub storage: StorageConfig,
    pub observability: ObservabilitySettings,
    pub default_max_iterations: usize,
    pub tenant_id: String,
}

impl OrchestratorConfig {
    pub fn new(tenant_id: impl Into<String>, llm: Arc<dyn LlmAdapter>) -> Self {
        Self {
            llm,
            mcp_adapter: None,
            storage: StorageConfig::default(),
            observability: ObservabilitySettings::default(),
            default_max_iterations: 25,
            tenant_id: tenant_id.into(),
        }
    }

    pub fn with_storage(mut self, storage: StorageConfig) -> Self {
        self.storage = storage;
        self
    }
}
