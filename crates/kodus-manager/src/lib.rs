//! Multi-Kernel Manager (spec §4.6): spawns namespaced kernels, routes
//! events across them via pattern-matched bridges, and aggregates status.
//!
//! Grounded on `restflow-core/src/channel/router.rs`'s routing table keyed
//! by topic pattern and `restflow-core/src/runtime/channel/forwarder.rs`'s
//! transform-then-forward step.

pub mod error;
pub mod pattern;
pub mod spec;

pub use error::{ManagerError, ManagerResult};
pub use spec::{Bridge, KernelSpec, Transform};

use dashmap::DashMap;
use kodus_contracts::{Event, KernelStatus};
use kodus_kernel::{ExecutionKernel, Runtime};
use kodus_traits::store::SnapshotStore;
use std::sync::Arc;

pub struct MultiKernelManager {
    kernels: DashMap<String, Arc<ExecutionKernel>>,
    namespace_index: DashMap<String, String>,
    bridges: Vec<Bridge>,
    durable_store: Arc<dyn SnapshotStore>,
}

impl MultiKernelManager {
    /// `durable_store` backs every spec with `needs_persistence = true`;
    /// specs without it get a throwaway in-memory persistor.
    pub fn new(durable_store: Arc<dyn SnapshotStore>, bridges: Vec<Bridge>) -> Arc<Self> {
        Arc::new(Self {
            kernels: DashMap::new(),
            namespace_index: DashMap::new(),
            bridges,
            durable_store,
        })
    }

    pub fn kernel_ids(&self) -> Vec<String> {
        self.kernels.iter().map(|e| e.key().clone()).collect()
    }

    pub fn kernel(&self, kernel_id: &str) -> Option<Arc<ExecutionKernel>> {
        self.kernels.get(kernel_id).map(|e| e.value().clone())
    }

    pub fn kernel_for_namespace(&self, namespace: &str) -> Option<Arc<ExecutionKernel>> {
        self.namespace_index
            .get(namespace)
            .and_then(|kernel_id| self.kernel(&kernel_id))
    }

    pub fn spawn(&self, spec: KernelSpec) -> ManagerResult<Arc<ExecutionKernel>> {
        if self.kernels.contains_key(&spec.kernel_id) {
            return Err(ManagerError::DuplicateKernel(spec.kernel_id));
        }

        let runtime = Runtime::new(spec.runtime_config.unwrap_or_default());
        let store: Arc<dyn SnapshotStore> = if spec.needs_persistence {
            self.durable_store.clone()
        } else {
            kodus_storage::InMemoryPersistor::new()
        };

        let kernel = ExecutionKernel::new(
            spec.kernel_id.clone(),
            spec.tenant_id,
            spec.job_id,
            spec.quotas.unwrap_or_default(),
            runtime,
            store,
            spec.performance.unwrap_or_default(),
        );

        self.kernels.insert(spec.kernel_id.clone(), kernel.clone());
        self.namespace_index.insert(spec.namespace, spec.kernel_id);
        Ok(kernel)
    }

    /// Called whenever `event` is observed flowing through `source_namespace`.
    /// Applies every matching bridge in order; a missing target or a target
    /// that isn't `running` skips that bridge rather than aborting the
    /// whole fan-out.
    pub async fn route_observed_event(&self, source_namespace: &str, event: &Event) -> Vec<ManagerResult<String>> {
        let mut outcomes = Vec::new();
        for bridge in &self.bridges {
            if bridge.from_namespace != source_namespace {
                continue;
            }
            if !pattern::matches(&bridge.event_pattern, &event.event_type) {
                continue;
            }

            let mut transformed = match &bridge.transform {
                Some(transform) => transform(event.clone()),
                None => event.clone(),
            };
            // correlationId is preserved end to end (spec §4.6) regardless
            // of what the transform did to it.
            transformed.metadata.correlation_id = event.metadata.correlation_id.clone();

            let Some(target) = self.kernel_for_namespace(&bridge.to_namespace) else {
                outcomes.push(Err(ManagerError::UnknownNamespace(bridge.to_namespace.clone())));
                continue;
            };

            if target.status().await != KernelStatus::Running {
                outcomes.push(Err(ManagerError::TargetNotRunning(bridge.to_namespace.clone())));
                continue;
            }

            if bridge.enable_logging {
                tracing::info!(
                    from = %bridge.from_namespace,
                    to = %bridge.to_namespace,
                    event_type = %transformed.event_type,
                    "routing event across bridge"
                );
            }

            let operation_id = format!("bridge-{}", transformed.id);
            let result = target
                .emit_async(&operation_id, transformed.event_type.clone(), transformed.data.clone())
                .await
                .map_err(ManagerError::from);
            outcomes.push(result);
        }
        outcomes
    }

    /// Snapshots only kernels whose spec requested it; others are merely
    /// quiesced (spec §4.6 `pauseAll`).
    pub async fn pause_all(&self, needs_snapshots: impl Fn(&str) -> bool) -> Vec<(String, ManagerResult<()>)> {
        let mut results = Vec::new();
        for entry in self.kernels.iter() {
            let kernel_id = entry.key().clone();
            let kernel = entry.value().clone();
            let operation_id = format!("pause-all-{kernel_id}");
            let outcome = if needs_snapshots(&kernel_id) {
                kernel.pause(&operation_id, "manager-pause-all").await.map_err(ManagerError::from)
            } else {
                kernel.quiesce(&operation_id).await.map_err(ManagerError::from)
            };
            results.push((kernel_id, outcome));
        }
        results
    }

    pub async fn resume_all(&self) -> Vec<(String, ManagerResult<()>)> {
        let mut results = Vec::new();
        for entry in self.kernels.iter() {
            let kernel_id = entry.key().clone();
            let kernel = entry.value().clone();
            let operation_id = format!("resume-all-{kernel_id}");
            let outcome = kernel.resume(&operation_id).await.map_err(ManagerError::from);
            results.push((kernel_id, outcome));
        }
        results
    }

    /// Emits directly into a namespace's kernel. Aborts if the target is
    /// paused unless `resume_if_paused` is set, in which case it resumes
    /// once then retries (spec §4.6 `emitToNamespace`).
    pub async fn emit_to_namespace(
        &self,
        namespace: &str,
        event_type: impl Into<String> + Clone,
        data: serde_json::Value,
        resume_if_paused: bool,
    ) -> ManagerResult<String> {
        let kernel = self
            .kernel_for_namespace(namespace)
            .ok_or_else(|| ManagerError::UnknownNamespace(namespace.to_string()))?;

        if kernel.status().await == KernelStatus::Paused {
            if !resume_if_paused {
                return Err(ManagerError::TargetNotRunning(namespace.to_string()));
            }
            kernel
                .resume(&format!("emit-to-namespace-resume-{namespace}"))
                .await?;
        }

        if kernel.status().await != KernelStatus::Running {
            return Err(ManagerError::TargetNotRunning(namespace.to_string()));
        }

        let operation_id = format!("emit-to-namespace-{}", uuid::Uuid::new_v4());
        kernel
            .emit_async(&operation_id, event_type.clone().into(), data)
            .await
            .map_err(ManagerError::from)
    }
}

/// Aggregated status across every managed kernel.
pub async fn aggregate_status(manager: &MultiKernelManager) -> std::collections::HashMap<String, KernelStatus> {
    let mut out = std::collections::HashMap::new();
    for kernel_id in manager.kernel_ids() {
        if let Some(kernel) = manager.kernel(&kernel_id) {
            out.insert(kernel_id, kernel.status().await);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use kodus_storage::InMemoryPersistor;
    use serde_json::json;

    fn store() -> Arc<dyn SnapshotStore> {
        InMemoryPersistor::new()
    }

    #[tokio::test]
    async fn spawn_rejects_duplicate_kernel_id() {
        let manager = MultiKernelManager::new(store(), vec![]);
        manager.spawn(KernelSpec::new("k1", "ns1", "tenant-1")).unwrap();
        let result = manager.spawn(KernelSpec::new("k1", "ns2", "tenant-1"));
        assert!(matches!(result, Err(ManagerError::DuplicateKernel(_))));
    }

    #[tokio::test]
    async fn routes_event_across_matching_bridge() {
        let manager = MultiKernelManager::new(
            store(),
            vec![Bridge::new("source", "target", "agent.*")],
        );
        let source = manager.spawn(KernelSpec::new("k-source", "source", "tenant-1")).unwrap();
        let target = manager.spawn(KernelSpec::new("k-target", "target", "tenant-1")).unwrap();
        source.initialize("init-source").await.unwrap();
        target.initialize("init-target").await.unwrap();
        // drain each kernel's own `kernel.started` event before asserting
        // on the bridged event count below.
        source.process_events("drain-source").await.unwrap();
        target.process_events("drain-target").await.unwrap();

        let event = Event::new("agent.tool.completed", json!({"ok": true})).with_correlation_id("corr-1");
        let outcomes = manager.route_observed_event("source", &event).await;
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].is_ok());

        target.process_events("process-target").await.unwrap();
        assert_eq!(target.snapshot_state().await.event_count, 1);
    }

    #[tokio::test]
    async fn bridge_skips_when_target_not_running() {
        let manager = MultiKernelManager::new(
            store(),
            vec![Bridge::new("source", "target", "*")],
        );
        manager.spawn(KernelSpec::new("k-source", "source", "tenant-1")).unwrap();
        manager.spawn(KernelSpec::new("k-target", "target", "tenant-1")).unwrap();
        // target never initialized => status stays `initialized`, not `running`.
        let event = Event::new("agent.error", json!({}));
        let outcomes = manager.route_observed_event("source", &event).await;
        assert!(matches!(outcomes[0], Err(ManagerError::TargetNotRunning(_))));
    }

    #[tokio::test]
    async fn pause_all_quiesces_non_persistent_kernels() {
        let manager = MultiKernelManager::new(store(), vec![]);
        let kernel = manager.spawn(KernelSpec::new("k1", "ns1", "tenant-1")).unwrap();
        kernel.initialize("init").await.unwrap();
        let results = manager.pause_all(|_| false).await;
        assert!(results[0].1.is_ok());
        assert_eq!(kernel.status().await, KernelStatus::Paused);
    }
}
