//! Atomic-operation gate (spec §4.5): every externally observable kernel
//! operation funnels through this gate for idempotency, a concurrency cap,
//! a deadline, and guaranteed release of the operation id on all exits.
//!
//! Grounded on `restflow-core/src/workflow/guard.rs`'s `OperationGuard`
//! RAII wrapper around a `DashSet` of in-flight operation ids.

use crate::error::{KernelError, KernelResult};
use dashmap::DashSet;
use std::sync::Arc;
use std::time::Duration;

pub struct AtomicOperationGate {
    pending: Arc<DashSet<String>>,
    max_concurrent_operations: usize,
}

/// Released automatically on drop so the id is freed on every exit path —
/// success, error, or timeout (spec §4.5 "guarantees release").
struct OperationLease {
    pending: Arc<DashSet<String>>,
    operation_id: String,
}

impl Drop for OperationLease {
    fn drop(&mut self) {
        self.pending.remove(&self.operation_id);
    }
}

impl AtomicOperationGate {
    pub fn new(max_concurrent_operations: usize) -> Self {
        Self {
            pending: Arc::new(DashSet::new()),
            max_concurrent_operations,
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, operation_id: &str) -> bool {
        self.pending.contains(operation_id)
    }

    /// Runs `body` under the gate with `deadline`. Rejects duplicate
    /// concurrent calls for the same `operation_id` and calls exceeding the
    /// concurrency cap, per spec §4.5 steps 1–2.
    pub async fn run<F, Fut, T>(&self, operation_id: &str, deadline: Duration, body: F) -> KernelResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = KernelResult<T>>,
    {
        if self.pending.contains(operation_id) {
            return Err(KernelError::DuplicateOperation(operation_id.to_string()));
        }
        if self.pending.len() >= self.max_concurrent_operations {
            return Err(KernelError::TooManyOperations(self.max_concurrent_operations));
        }

        self.pending.insert(operation_id.to_string());
        let _lease = OperationLease {
            pending: self.pending.clone(),
            operation_id: operation_id.to_string(),
        };

        match tokio::time::timeout(deadline, body()).await {
            Ok(result) => result,
            Err(_) => Err(KernelError::OperationTimeout(operation_id.to_string())),
        }
    }
}
