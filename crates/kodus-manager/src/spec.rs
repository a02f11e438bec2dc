//! Kernel specs and cross-kernel bridges (spec §4.6).

use kodus_contracts::Quotas;
use kodus_kernel::{KernelConfig, QueueConfig};
use kodus_contracts::Event;
use std::sync::Arc;

#[derive(Clone)]
pub struct KernelSpec {
    pub kernel_id: String,
    pub namespace: String,
    pub tenant_id: String,
    pub job_id: String,
    pub needs_persistence: bool,
    pub needs_snapshots: bool,
    pub quotas: Option<Quotas>,
    pub runtime_config: Option<QueueConfig>,
    pub performance: Option<KernelConfig>,
}

impl KernelSpec {
    pub fn new(kernel_id: impl Into<String>, namespace: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self {
            kernel_id: kernel_id.into(),
            namespace: namespace.into(),
            tenant_id: tenant_id.into(),
            job_id: uuid::Uuid::new_v4().to_string(),
            needs_persistence: false,
            needs_snapshots: false,
            quotas: None,
            runtime_config: None,
            performance: None,
        }
    }
}

pub type Transform = Arc<dyn Fn(Event) -> Event + Send + Sync>;

/// `(fromNamespace, toNamespace, eventPattern, transform?, enableLogging?)`.
#[derive(Clone)]
pub struct Bridge {
    pub from_namespace: String,
    pub to_namespace: String,
    pub event_pattern: String,
    pub transform: Option<Transform>,
    pub enable_logging: bool,
}

impl Bridge {
    pub fn new(from_namespace: impl Into<String>, to_namespace: impl Into<String>, event_pattern: impl Into<String>) -> Self {
        Self {
            from_namespace: from_namespace.into(),
            to_namespace: to_namespace.into(),
            event_pattern: event_pattern.into(),
            transform: None,
            enable_logging: false,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }
}
