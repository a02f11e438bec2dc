//! Runtime (spec §4.4): wraps the Event Queue with a handler registry,
//! middleware chain, tenant-scoped views, and a lazy stream.
//!
//! Grounded on `restflow-core/src/events/bus.rs`'s handler map keyed by event
//! type plus a `'*'` wildcard list, adapted to drive from `EventQueue`
//! batches instead of a broadcast channel.

use crate::error::{KernelError, KernelResult};
use crate::queue::{EnqueueOutcome, EventQueue, QueueConfig};
use async_trait::async_trait;
use kodus_contracts::{DeliveryGuarantee, Event, Priority};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// A handler invoked for every dispatched event whose type it subscribed to.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &Event) -> anyhow::Result<()>;
}

#[async_trait]
impl<F> EventHandler for F
where
    F: Fn(&Event) -> anyhow::Result<()> + Send + Sync,
{
    async fn handle(&self, event: &Event) -> anyhow::Result<()> {
        (self)(event)
    }
}

/// Runs before every handler invocation; observability middleware (spec
/// §4.4 "observability first") goes at index 0.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn before(&self, event: &Event);
    async fn after(&self, event: &Event, result: &anyhow::Result<()>);
}

pub struct TracingMiddleware;

#[async_trait]
impl Middleware for TracingMiddleware {
    async fn before(&self, event: &Event) {
        tracing::debug!(event_id = %event.id, event_type = %event.event_type, "dispatching event");
    }

    async fn after(&self, event: &Event, result: &anyhow::Result<()>) {
        match result {
            Ok(()) => tracing::debug!(event_id = %event.id, "event handled"),
            Err(err) => tracing::warn!(event_id = %event.id, error = %err, "event handler failed"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EmitOptions {
    pub priority: Option<Priority>,
    pub correlation_id: Option<String>,
    pub delivery_guarantee: Option<DeliveryGuarantee>,
}

#[derive(Debug, Clone, Default)]
pub struct ProcessStats {
    pub processed: u64,
    pub acked: u64,
    pub failed: u64,
}

struct Registration {
    id: u64,
    handler: Arc<dyn EventHandler>,
}

/// Runtime owning the Event Queue and the handler registry (spec §4.4).
pub struct Runtime {
    queue: Arc<EventQueue>,
    handlers: RwLock<Vec<(String, Registration)>>,
    middleware: RwLock<Vec<Arc<dyn Middleware>>>,
    next_handler_id: AtomicU64,
    tenant_filter: Option<String>,
}

impl Runtime {
    pub fn new(config: QueueConfig) -> Arc<Self> {
        Arc::new(Self {
            queue: EventQueue::new(config),
            handlers: RwLock::new(Vec::new()),
            middleware: RwLock::new(vec![Arc::new(TracingMiddleware)]),
            next_handler_id: AtomicU64::new(0),
            tenant_filter: None,
        })
    }

    pub fn queue(&self) -> Arc<EventQueue> {
        self.queue.clone()
    }

    pub async fn use_middleware(&self, middleware: Arc<dyn Middleware>) {
        self.middleware.write().await.push(middleware);
    }

    /// Subscribes `handler` to `event_type`, or to all events when
    /// `event_type == "*"`. Returns a handler id usable with `off`.
    pub async fn on(&self, event_type: impl Into<String>, handler: Arc<dyn EventHandler>) -> u64 {
        let id = self.next_handler_id.fetch_add(1, Ordering::SeqCst);
        self.handlers
            .write()
            .await
            .push((event_type.into(), Registration { id, handler }));
        id
    }

    pub async fn off(&self, handler_id: u64) {
        self.handlers.write().await.retain(|(_, reg)| reg.id != handler_id);
    }

    /// Synchronous enqueue (spec §4.4 `emit`).
    pub fn emit(&self, event_type: impl Into<String>, data: Value, options: EmitOptions) -> (EnqueueOutcome, String) {
        self.build_and_enqueue(event_type, data, options)
    }

    /// Same contract as `emit`; kept as a distinct entry point because the
    /// spec names both `emit` and `emitAsync` and callers may want to await
    /// backpressure relief before returning.
    pub async fn emit_async(
        &self,
        event_type: impl Into<String>,
        data: Value,
        options: EmitOptions,
    ) -> (EnqueueOutcome, String) {
        if self.queue.backpressure_active() {
            self.queue.wait_for_events(std::time::Duration::from_millis(50)).await;
        }
        self.build_and_enqueue(event_type, data, options)
    }

    fn build_and_enqueue(
        &self,
        event_type: impl Into<String>,
        data: Value,
        options: EmitOptions,
    ) -> (EnqueueOutcome, String) {
        let mut event = Event::new(event_type, data);
        if let Some(priority) = options.priority {
            event = event.with_priority(priority);
        }
        if let Some(correlation_id) = options.correlation_id {
            event = event.with_correlation_id(correlation_id);
        }
        if let Some(guarantee) = options.delivery_guarantee {
            event = event.with_delivery_guarantee(guarantee);
        }
        if let Some(tenant_id) = &self.tenant_filter {
            event.metadata.tenant_id = Some(tenant_id.clone());
        }
        self.queue.enqueue(event, false)
    }

    /// Drains the queue in batches until an empty batch is observed (spec
    /// §4.4 `process`). Handlers run under the middleware chain; a handler
    /// error nacks the event (retry/DLQ), a normal return acks it.
    pub async fn process(self: &Arc<Self>) -> KernelResult<ProcessStats> {
        let mut stats = ProcessStats::default();
        loop {
            let batch = self.queue.pop_batch();
            if batch.is_empty() {
                break;
            }
            for event in batch {
                stats.processed += 1;
                if let Some(tenant_id) = &self.tenant_filter {
                    if event.metadata.tenant_id.as_deref() != Some(tenant_id.as_str()) {
                        continue;
                    }
                }

                let middleware = self.middleware.read().await;
                for m in middleware.iter() {
                    m.before(&event).await;
                }
                drop(middleware);

                let result = self.dispatch_to_handlers(&event).await;

                let middleware = self.middleware.read().await;
                for m in middleware.iter() {
                    m.after(&event, &result).await;
                }
                drop(middleware);

                match result {
                    Ok(()) => {
                        self.queue.ack(&event.id);
                        stats.acked += 1;
                    }
                    Err(err) => {
                        self.queue.nack(&event.id, err.to_string());
                        stats.failed += 1;
                    }
                }
            }
        }
        Ok(stats)
    }

    async fn dispatch_to_handlers(&self, event: &Event) -> anyhow::Result<()> {
        let handlers = self.handlers.read().await;
        for (event_type, registration) in handlers.iter() {
            if event_type == "*" || event_type == &event.event_type {
                registration.handler.handle(event).await?;
            }
        }
        Ok(())
    }

    /// Returns a tenant-scoped view: emits are tagged with `tenant_id` and
    /// `process` skips events belonging to other tenants (spec §4.4
    /// `forTenant`).
    pub fn for_tenant(self: &Arc<Self>, tenant_id: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            queue: self.queue.clone(),
            handlers: RwLock::new(Vec::new()),
            middleware: RwLock::new(vec![Arc::new(TracingMiddleware)]),
            next_handler_id: AtomicU64::new(0),
            tenant_filter: Some(tenant_id.into()),
        })
    }

    /// Returns a lazy sequence of events generated by `generator`, one at a
    /// time, without auto-acking (spec §4.4 `createStream`: "single-consumer
    /// and does not ack automatically").
    pub fn create_stream<G>(self: &Arc<Self>, generator: G) -> EventStream<G>
    where
        G: FnMut() -> Option<Event> + Send,
    {
        EventStream {
            generator,
            queue: self.queue.clone(),
        }
    }
}

pub struct EventStream<G> {
    generator: G,
    queue: Arc<EventQueue>,
}

impl<G> EventStream<G>
where
    G: FnMut() -> Option<Event> + Send,
{
    pub fn next(&mut self) -> Option<Event> {
        (self.generator)()
    }

    /// Manual ack for a stream-consumed event, since `createStream` never
    /// acks automatically.
    pub fn ack(&self, event_id: &str) {
        self.queue.ack(event_id);
    }
}

pub use KernelError as RuntimeError;
pub type RuntimeResult<T> = KernelResult<T>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    struct Counter(Arc<AtomicUsize>);

    #[async_trait]
    impl EventHandler for Counter {
        async fn handle(&self, _event: &Event) -> anyhow::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn on_wildcard_receives_every_event() {
        let runtime = Runtime::new(QueueConfig::default());
        let count = Arc::new(AtomicUsize::new(0));
        runtime.on("*", Arc::new(Counter(count.clone()))).await;
        runtime.emit("agent.action.start", json!({}), EmitOptions::default());
        runtime.emit("agent.tool.completed", json!({}), EmitOptions::default());
        let stats = runtime.process().await.unwrap();
        assert_eq!(stats.processed, 2);
        assert_eq!(stats.acked, 2);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn off_stops_further_dispatch() {
        let runtime = Runtime::new(QueueConfig::default());
        let count = Arc::new(AtomicUsize::new(0));
        let id = runtime.on("*", Arc::new(Counter(count.clone()))).await;
        runtime.off(id).await;
        runtime.emit("agent.action.start", json!({}), EmitOptions::default());
        runtime.process().await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    struct Failing;

    #[async_trait]
    impl EventHandler for Failing {
        async fn handle(&self, _event: &Event) -> anyhow::Result<()> {
            anyhow::bail!("boom")
        }
    }

    #[tokio::test]
    async fn failing_handler_nacks_instead_of_acking() {
        let runtime = Runtime::new(QueueConfig {
            max_retries: 3,
            base_backoff_ms: 1,
            max_backoff_ms: 1,
            ..QueueConfig::default()
        });
        runtime.on("*", Arc::new(Failing)).await;
        let event = Event::new("agent.error", json!({})).with_delivery_guarantee(DeliveryGuarantee::AtLeastOnce);
        runtime.queue().enqueue(event, false);
        let stats = runtime.process().await.unwrap();
        assert_eq!(stats.failed, 1);
    }

    #[tokio::test]
    async fn for_tenant_view_filters_other_tenants() {
        let runtime = Runtime::new(QueueConfig::default());
        let scoped = runtime.for_tenant("tenant-a");
        let count = Arc::new(AtomicUsize::new(0));
        scoped.on("*", Arc::new(Counter(count.clone()))).await;

        scoped.emit("agent.action.start", json!({}), EmitOptions::default());
        runtime.emit("agent.action.start", json!({}), EmitOptions::default());

        let stats = scoped.process().await.unwrap();
        assert_eq!(stats.processed, 2);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
