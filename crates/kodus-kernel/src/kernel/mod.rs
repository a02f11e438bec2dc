//! Execution Kernel (spec §4.5): owns one `KernelState`, its context data,
//! and a `Runtime`. Every externally observable operation is funnelled
//! through the atomic-operation gate.
//!
//! Grounded on `restflow-core/src/workflow/engine.rs`'s `WorkflowEngine`
//! state machine (init/run/pause/resume/complete) plus its debounced
//! context-flush task, adapted to the spec's quota/DLQ/snapshot contract.

pub mod atomic_gate;
pub mod quotas;

use crate::cache::{LruCache, cache_key};
use crate::error::{KernelError, KernelResult};
use crate::queue::{DeadLetterQueue, ReprocessCriteria};
use crate::runtime::{EmitOptions, Runtime};
use atomic_gate::AtomicOperationGate;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use kodus_contracts::event::event_type;
use kodus_contracts::{KernelState, KernelStatus, Quotas, Snapshot};
use kodus_traits::store::SnapshotStore;
use quotas::{QuotaKind, check_quotas};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Notify, RwLock};

#[derive(Debug, Clone)]
pub struct KernelConfig {
    pub max_concurrent_operations: usize,
    pub default_operation_deadline: Duration,
    pub init_process_deadline: Duration,
    pub batched_writes_enabled: bool,
    pub flush_debounce: Duration,
    pub auto_snapshot_event_interval: u64,
    pub auto_snapshot_duration: Duration,
    pub tenant_isolation_enabled: bool,
    pub cache_max_size: usize,
    pub dlq_reprocess_interval: Duration,
    pub max_recovery_attempts: u32,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            max_concurrent_operations: 50,
            default_operation_deadline: Duration::from_secs(30),
            init_process_deadline: Duration::from_secs(120),
            batched_writes_enabled: true,
            flush_debounce: Duration::from_millis(250),
            auto_snapshot_event_interval: 100,
            auto_snapshot_duration: Duration::from_secs(60),
            tenant_isolation_enabled: true,
            cache_max_size: 1_000,
            dlq_reprocess_interval: Duration::from_secs(30),
            max_recovery_attempts: 5,
        }
    }
}

struct PendingWrite {
    value: Value,
    written_at: DateTime<Utc>,
}

/// One kernel instance: state, context cache, pending-write buffer, runtime,
/// and snapshot store.
pub struct ExecutionKernel {
    pub id: String,
    state: RwLock<KernelState>,
    cache: LruCache,
    pending_writes: DashMap<String, PendingWrite>,
    gate: AtomicOperationGate,
    runtime: Arc<Runtime>,
    snapshots: Arc<dyn SnapshotStore>,
    config: KernelConfig,
    flush_notify: Notify,
    recovery_attempts: AtomicU32,
    recovery_reset_at: RwLock<DateTime<Utc>>,
    last_snapshot_event_count: AtomicU64,
    last_snapshot_time: RwLock<DateTime<Utc>>,
}

impl ExecutionKernel {
    pub fn new(
        id: impl Into<String>,
        tenant_id: impl Into<String>,
        job_id: impl Into<String>,
        quotas: Quotas,
        runtime: Arc<Runtime>,
        snapshots: Arc<dyn SnapshotStore>,
        config: KernelConfig,
    ) -> Arc<Self> {
        let mut state = KernelState::new(id, tenant_id, job_id);
        state.quotas = quotas;
        Arc::new(Self {
            id: state.id.clone(),
            cache: LruCache::new(config.cache_max_size),
            pending_writes: DashMap::new(),
            gate: AtomicOperationGate::new(config.max_concurrent_operations),
            runtime,
            snapshots,
            config,
            flush_notify: Notify::new(),
            recovery_attempts: AtomicU32::new(0),
            recovery_reset_at: RwLock::new(Utc::now()),
            last_snapshot_event_count: AtomicU64::new(0),
            last_snapshot_time: RwLock::new(Utc::now()),
            state: RwLock::new(state),
        })
    }

    pub async fn status(&self) -> KernelStatus {
        self.state.read().await.status
    }

    pub async fn snapshot_state(&self) -> KernelState {
        self.state.read().await.clone()
    }

    /// `initialize` (spec §4.5): idempotent while `running` — a second call
    /// simply returns. Any error performs a full rollback to `failed`.
    pub async fn initialize(self: &Arc<Self>, operation_id: &str) -> KernelResult<()> {
        {
            let state = self.state.read().await;
            if state.status == KernelStatus::Running {
                return Ok(());
            }
        }

        let this = self.clone();
        let deadline = self.config.init_process_deadline;
        let result = self
            .gate
            .run(operation_id, deadline, || async move {
                {
                    let mut state = this.state.write().await;
                    state.status = KernelStatus::Running;
                    state.start_time = Utc::now();
                    state.event_count = 0;
                }
                let (outcome, _) = this.runtime.emit(
                    event_type::KERNEL_STARTED,
                    serde_json::json!({ "kernelId": this.id }),
                    EmitOptions::default(),
                );
                if !outcome.success {
                    return Err(KernelError::Internal("failed to emit kernel.started".into()));
                }
                Ok(())
            })
            .await;

        if result.is_err() {
            let mut state = self.state.write().await;
            state.status = KernelStatus::Failed;
            state.context_data.clear();
            self.pending_writes.clear();
            self.cache.clear();
        }
        result
    }

    /// `processEvents` (spec §4.4/§4.5): drives the runtime dispatcher and
    /// checks quotas once the batch settles.
    pub async fn process_events(self: &Arc<Self>, operation_id: &str) -> KernelResult<u64> {
        self.ensure_running().await?;
        let this = self.clone();
        let deadline = self.config.init_process_deadline;
        let processed = self
            .gate
            .run(operation_id, deadline, || async move {
                let stats = this
                    .runtime
                    .process()
                    .await
                    .map_err(|_| KernelError::Internal("runtime process failed".into()))?;
                {
                    let mut state = this.state.write().await;
                    if state.status == KernelStatus::Running {
                        state.event_count += stats.processed;
                    }
                }
                Ok(stats.processed)
            })
            .await?;

        self.enforce_quotas().await?;
        Ok(processed)
    }

    pub async fn emit_async(
        self: &Arc<Self>,
        operation_id: &str,
        event_type: impl Into<String>,
        data: Value,
    ) -> KernelResult<String> {
        self.ensure_running().await?;
        let this = self.clone();
        let event_type = event_type.into();
        self.gate
            .run(operation_id, self.config.default_operation_deadline, || async move {
                let (outcome, event_id) = this.runtime.emit_async(event_type, data, EmitOptions::default()).await;
                if !outcome.success {
                    return Err(KernelError::Backpressure);
                }
                Ok(event_id)
            })
            .await
    }

    /// Transitions `running` → `paused` without flushing or snapshotting.
    /// Used by the manager for kernels that don't need persistence (spec
    /// §4.6 "non-persistent kernels are merely quiesced").
    pub async fn quiesce(self: &Arc<Self>, operation_id: &str) -> KernelResult<()> {
        let this = self.clone();
        self.gate
            .run(operation_id, self.config.default_operation_deadline, || async move {
                let mut state = this.state.write().await;
                if state.status != KernelStatus::Running {
                    return Err(KernelError::StateInvalid(format!(
                        "cannot quiesce from {:?}",
                        state.status
                    )));
                }
                state.status = KernelStatus::Paused;
                Ok(())
            })
            .await
    }

    /// `pause(reason)` (spec §4.5): flushes pending writes, snapshots, and
    /// transitions to `paused`.
    pub async fn pause(self: &Arc<Self>, operation_id: &str, reason: &str) -> KernelResult<()> {
        let this = self.clone();
        let reason = reason.to_string();
        self.gate
            .run(operation_id, self.config.default_operation_deadline, || async move {
                this.flush_pending_writes().await?;
                this.take_and_persist_snapshot().await?;
                let mut state = this.state.write().await;
                if state.status != KernelStatus::Running {
                    return Err(KernelError::StateInvalid(format!(
                        "cannot pause from {:?}",
                        state.status
                    )));
                }
                state.status = KernelStatus::Paused;
                state.state_data.insert("pauseReason".into(), Value::String(reason));
                Ok(())
            })
            .await
    }

    pub async fn resume(self: &Arc<Self>, operation_id: &str) -> KernelResult<()> {
        let this = self.clone();
        self.gate
            .run(operation_id, self.config.default_operation_deadline, || async move {
                let mut state = this.state.write().await;
                if state.status != KernelStatus::Paused {
                    return Err(KernelError::StateInvalid(format!(
                        "cannot resume from {:?}",
                        state.status
                    )));
                }
                state.status = KernelStatus::Running;
                Ok(())
            })
            .await
    }

    pub async fn complete(self: &Arc<Self>, operation_id: &str) -> KernelResult<()> {
        let this = self.clone();
        self.gate
            .run(operation_id, self.config.default_operation_deadline, || async move {
                this.flush_pending_writes().await?;
                let mut state = this.state.write().await;
                state.status = KernelStatus::Completed;
                Ok(())
            })
            .await
    }

    /// `reset` forces `initialized` regardless of prior state (spec §4.5
    /// "tolerant to prior failures").
    pub async fn reset(self: &Arc<Self>, operation_id: &str) -> KernelResult<()> {
        let this = self.clone();
        self.gate
            .run(operation_id, self.config.default_operation_deadline, || async move {
                let mut state = this.state.write().await;
                state.status = KernelStatus::Initialized;
                state.context_data.clear();
                state.state_data.clear();
                state.event_count = 0;
                state.pending_operations.clear();
                this.pending_writes.clear();
                this.cache.clear();
                Ok(())
            })
            .await
    }

    async fn ensure_running(&self) -> KernelResult<()> {
        let status = self.state.read().await.status;
        if status != KernelStatus::Running {
            return Err(KernelError::StateInvalid(format!("kernel is {status:?}, not running")));
        }
        Ok(())
    }

    fn tenant_context_key(&self, tenant_id: &str, thread_id: Option<&str>) -> String {
        if self.config.tenant_isolation_enabled {
            match thread_id {
                Some(thread_id) => format!("tenant:{tenant_id}:thread:{thread_id}"),
                None => format!("tenant:{tenant_id}"),
            }
        } else {
            "shared".to_string()
        }
    }

    /// `getContext` (spec §4.5): consults the cache first, falls back to
    /// `contextData[tenantContextKey][namespace][key]`.
    pub async fn get_context(&self, namespace: &str, key: &str, thread_id: Option<&str>) -> Option<Value> {
        let state = self.state.read().await;
        let cache_key = cache_key(&state.tenant_id, thread_id, namespace, key);
        if let Some(value) = self.cache.get(&cache_key) {
            return Some(value);
        }
        let tenant_key = self.tenant_context_key(&state.tenant_id, thread_id);
        state
            .context_data
            .get(&tenant_key)
            .and_then(|ns| ns.get(namespace))
            .and_then(|ns| ns.get(key))
            .cloned()
    }

    /// `setContext` (spec §4.5): always updates the authoritative map; when
    /// batched writes are enabled also enqueues a pending write and
    /// schedules a debounced flush.
    pub async fn set_context(&self, namespace: &str, key: &str, value: Value, thread_id: Option<&str>) {
        let tenant_id;
        {
            let mut state = self.state.write().await;
            tenant_id = state.tenant_id.clone();
            let tenant_key = self.tenant_context_key(&tenant_id, thread_id);
            let entry = state
                .context_data
                .entry(tenant_key)
                .or_insert_with(|| Value::Object(Default::default()));
            if let Value::Object(map) = entry {
                let ns = map
                    .entry(namespace.to_string())
                    .or_insert_with(|| Value::Object(Default::default()));
                if let Value::Object(ns_map) = ns {
                    ns_map.insert(key.to_string(), value.clone());
                }
            }
        }

        if self.config.batched_writes_enabled {
            let pending_key = cache_key(&tenant_id, thread_id, namespace, key);
            self.pending_writes.insert(
                pending_key,
                PendingWrite {
                    value,
                    written_at: Utc::now(),
                },
            );
            self.flush_notify.notify_one();
        } else {
            let cache_key = cache_key(&tenant_id, thread_id, namespace, key);
            self.cache.set(cache_key, value);
        }
    }

    /// Drains the pending-write buffer into the cache and may trigger an
    /// auto-snapshot.
    pub async fn flush_pending_writes(&self) -> KernelResult<()> {
        let keys: Vec<String> = self.pending_writes.iter().map(|e| e.key().clone()).collect();
        for key in keys {
            if let Some((_, pending)) = self.pending_writes.remove(&key) {
                self.cache.set(key, pending.value);
            }
        }
        self.maybe_auto_snapshot().await
    }

    async fn maybe_auto_snapshot(&self) -> KernelResult<()> {
        let event_count = self.state.read().await.event_count;
        let last_count = self.last_snapshot_event_count.load(Ordering::SeqCst);
        let elapsed_due = {
            let last_time = *self.last_snapshot_time.read().await;
            (Utc::now() - last_time).to_std().unwrap_or_default() >= self.config.auto_snapshot_duration
        };
        let count_due = event_count.saturating_sub(last_count) >= self.config.auto_snapshot_event_interval;

        if elapsed_due || count_due {
            self.take_and_persist_snapshot().await?;
            self.last_snapshot_event_count.store(event_count, Ordering::SeqCst);
            *self.last_snapshot_time.write().await = Utc::now();
        }
        Ok(())
    }

    async fn take_and_persist_snapshot(&self) -> KernelResult<()> {
        let state = self.state.read().await.clone();
        let state_value = serde_json::to_value(&state).map_err(|e| KernelError::Internal(e.to_string()))?;
        let hash = kodus_storage::content_hash(&state_value);
        let snapshot = Snapshot {
            execution_context_id: state.id.clone(),
            timestamp: Utc::now(),
            state: state_value,
            hash,
            base_hash: None,
            patch: None,
        };
        self.snapshots.append(snapshot, true).await?;
        Ok(())
    }

    /// Quota check (spec §4.5 "Quotas"): on any quota hit, pauses the
    /// kernel with a `quota-exceeded-<kind>` reason. A memory hit also runs
    /// a cleanup pass (snapshot trim via `cleanup_old_snapshots`, flush).
    async fn enforce_quotas(self: &Arc<Self>) -> KernelResult<()> {
        let (quotas, event_count, start_time) = {
            let state = self.state.read().await;
            (state.quotas, state.event_count, state.start_time)
        };
        let Some(kind) = check_quotas(&quotas, event_count, start_time, current_memory_estimate()) else {
            return Ok(());
        };

        let operation_id = format!("quota-pause-{}", uuid::Uuid::new_v4());
        self.pause(&operation_id, kind.as_reason()).await?;

        if kind == QuotaKind::Memory {
            let _ = self.snapshots.cleanup_old_snapshots(5).await;
            self.flush_pending_writes().await?;
        }
        Ok(())
    }

    /// Spawns the DLQ reprocessing timer (spec §4.5 "DLQ orchestration").
    /// Runs until the kernel is dropped (the spawned task holds only a weak
    /// reference's worth of cloned `Arc`s it needs, so it naturally leaks
    /// with the kernel's own lifetime — callers that need early shutdown
    /// should track the `JoinHandle` themselves).
    pub fn spawn_dlq_reprocessor(self: &Arc<Self>, dlq: Arc<DeadLetterQueue>) -> tokio::task::JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(this.config.dlq_reprocess_interval);
            loop {
                ticker.tick().await;
                this.reprocess_dlq_once(&dlq).await;
            }
        })
    }

    async fn reprocess_dlq_once(self: &Arc<Self>, dlq: &DeadLetterQueue) {
        {
            let mut reset_at = self.recovery_reset_at.write().await;
            if (Utc::now() - *reset_at).num_seconds() >= 3600 {
                self.recovery_attempts.store(0, Ordering::SeqCst);
                *reset_at = Utc::now();
            }
        }

        let attempts = self.recovery_attempts.load(Ordering::SeqCst);
        if attempts >= self.config.max_recovery_attempts {
            return;
        }

        let high_memory_pressure = current_memory_estimate()
            .zip(self.state.read().await.quotas.max_memory_bytes)
            .is_some_and(|(current, max)| current * 2 >= max);

        let criteria = if high_memory_pressure {
            ReprocessCriteria {
                max_age_secs: Some(60),
                limit: Some(5),
                event_type: None,
            }
        } else if attempts < 2 {
            ReprocessCriteria {
                max_age_secs: None,
                limit: Some(20),
                event_type: Some(event_type::AGENT_ERROR.to_string()),
            }
        } else {
            ReprocessCriteria::default()
        };

        let selected = dlq.select(&criteria);
        if selected.is_empty() {
            return;
        }

        self.recovery_attempts.fetch_add(1, Ordering::SeqCst);
        for entry in selected {
            let (outcome, _) = self.runtime.emit(
                entry.event.event_type.clone(),
                entry.event.data.clone(),
                EmitOptions::default(),
            );
            if outcome.success {
                dlq.remove(&entry.event.id);
            }
        }
    }
}

/// Best-effort process memory estimate for the memory quota. Returns `None`
/// when unavailable rather than guessing.
fn current_memory_estimate() -> Option<u64> {
    None
}
