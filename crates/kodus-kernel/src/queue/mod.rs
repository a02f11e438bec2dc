//! Event Queue (spec §4.3): bounded priority queue with backpressure,
//! batching, compression, DLQ, retry-with-backoff, and ack/nack.
//!
//! Grounded on `restflow-core/src/performance/task_queue.rs`'s per-priority
//! `SegQueue` tiers guarded by atomic counters and a `Semaphore`.

pub mod dlq;

pub use dlq::{DeadLetterQueue, DlqEntry, ReprocessCriteria};

use crossbeam_queue::SegQueue;
use dashmap::DashMap;
use kodus_contracts::event::event_type;
use kodus_contracts::{DeliveryGuarantee, Event, Priority};
use std::io::{Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub max_queue_depth: usize,
    pub high_watermark: usize,
    pub low_watermark: usize,
    pub batch_size: usize,
    /// Payloads whose serialized size exceeds this many bytes are
    /// gzip-compressed in place (spec §4.3 "Compression").
    pub large_event_threshold_bytes: usize,
    pub max_retries: u32,
    pub base_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_queue_depth: 10_000,
            high_watermark: 8_000,
            low_watermark: 4_000,
            batch_size: 100,
            large_event_threshold_bytes: 10 * 1024,
            max_retries: 5,
            base_backoff_ms: 100,
            max_backoff_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EnqueueOutcome {
    pub success: bool,
    pub queued: bool,
}

struct PendingAck {
    event: Event,
    attempts: u32,
}

/// Bounded, priority-ordered event queue. One instance per kernel (spec §5
/// "Scheduling model": "a single-threaded cooperative dispatcher inside each
/// kernel").
pub struct EventQueue {
    critical: SegQueue<Event>,
    high: SegQueue<Event>,
    normal: SegQueue<Event>,
    low: SegQueue<Event>,
    depth: AtomicUsize,
    backpressure_active: AtomicBool,
    pending_ack: DashMap<String, PendingAck>,
    dlq: Arc<DeadLetterQueue>,
    config: QueueConfig,
    notify: Notify,
}

impl EventQueue {
    pub fn new(config: QueueConfig) -> Arc<Self> {
        Arc::new(Self {
            critical: SegQueue::new(),
            high: SegQueue::new(),
            normal: SegQueue::new(),
            low: SegQueue::new(),
            depth: AtomicUsize::new(0),
            backpressure_active: AtomicBool::new(false),
            pending_ack: DashMap::new(),
            dlq: DeadLetterQueue::new(),
            config,
            notify: Notify::new(),
        })
    }

    pub fn dlq(&self) -> Arc<DeadLetterQueue> {
        self.dlq.clone()
    }

    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    pub fn backpressure_active(&self) -> bool {
        self.backpressure_active.load(Ordering::SeqCst)
    }

    /// Enqueues an event, returning `(success, queued, eventId)` per spec
    /// §4.3. Flush-critical event types (`kernel.completed`, etc.) are
    /// promoted to `Priority::Critical` on entry so they always win the
    /// non-critical backpressure/depth check and drain before any batch.
    pub fn enqueue(&self, mut event: Event, is_critical_producer: bool) -> (EnqueueOutcome, String) {
        let event_id = event.id.clone();
        if event.is_flush_critical() {
            event.priority = Priority::Critical;
        }

        let depth = self.depth.load(Ordering::SeqCst);
        if depth >= self.config.max_queue_depth && !is_critical_producer && !event.is_flush_critical() {
            return (
                EnqueueOutcome {
                    success: false,
                    queued: false,
                },
                event_id,
            );
        }

        self.compress_if_needed(&mut event);

        if event.delivery_guarantee == Some(DeliveryGuarantee::AtLeastOnce) {
            self.pending_ack.insert(
                event_id.clone(),
                PendingAck {
                    event: event.clone(),
                    attempts: 0,
                },
            );
        }

        match event.priority {
            Priority::Critical => self.critical.push(event),
            Priority::High => self.high.push(event),
            Priority::Normal => self.normal.push(event),
            Priority::Low => self.low.push(event),
        }
        let new_depth = self.depth.fetch_add(1, Ordering::SeqCst) + 1;
        self.update_backpressure(new_depth);
        self.notify.notify_one();

        (
            EnqueueOutcome {
                success: true,
                queued: true,
            },
            event_id,
        )
    }

    fn update_backpressure(&self, depth: usize) {
        if depth >= self.config.high_watermark {
            self.backpressure_active.store(true, Ordering::SeqCst);
        } else if depth < self.config.low_watermark {
            self.backpressure_active.store(false, Ordering::SeqCst);
        }
    }

    /// Pops a single event honoring strict priority order, decompressing
    /// transparently.
    pub fn pop(&self) -> Option<Event> {
        let popped = self
            .critical
            .pop()
            .or_else(|| self.high.pop())
            .or_else(|| self.normal.pop())
            .or_else(|| self.low.pop());
        if let Some(event) = popped {
            self.depth.fetch_sub(1, Ordering::SeqCst);
            self.update_backpressure(self.depth.load(Ordering::SeqCst));
            Some(self.decompress(event))
        } else {
            None
        }
    }

    /// Pulls up to `batch_size` events for one dispatch round (spec §4.3
    /// "Batching"). Flush-critical events occupy `Priority::Critical` and are
    /// therefore always at the front, satisfying "short-circuit the batch".
    pub fn pop_batch(&self) -> Vec<Event> {
        let mut batch = Vec::with_capacity(self.config.batch_size);
        for _ in 0..self.config.batch_size {
            match self.pop() {
                Some(event) => batch.push(event),
                None => break,
            }
        }
        batch
    }

    pub async fn wait_for_events(&self, timeout: Duration) {
        let _ = tokio::time::timeout(timeout, self.notify.notified()).await;
    }

    pub fn ack(&self, event_id: &str) {
        self.pending_ack.remove(event_id);
    }

    /// Nacks an at-least-once event: retries with exponential backoff up to
    /// `maxRetries`, then moves it to the DLQ (spec §4.3 "Ack/Nack").
    pub fn nack(self: &Arc<Self>, event_id: &str, error: String) {
        let Some((_, mut pending)) = self.pending_ack.remove(event_id) else {
            return;
        };
        pending.attempts += 1;

        if pending.attempts > self.config.max_retries {
            self.dlq.push(pending.event, error);
            return;
        }

        let backoff_ms = (self.config.base_backoff_ms * 2u64.saturating_pow(pending.attempts - 1))
            .min(self.config.max_backoff_ms);
        let queue = Arc::clone(self);
        let event = pending.event.clone();
        let attempts = pending.attempts;
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            queue.pending_ack.insert(
                event.id.clone(),
                PendingAck {
                    event: event.clone(),
                    attempts,
                },
            );
            match event.priority {
                Priority::Critical => queue.critical.push(event.clone()),
                Priority::High => queue.high.push(event.clone()),
                Priority::Normal => queue.normal.push(event.clone()),
                Priority::Low => queue.low.push(event.clone()),
            }
            queue.depth.fetch_add(1, Ordering::SeqCst);
            queue.notify.notify_one();
        });
    }

    fn compress_if_needed(&self, event: &mut Event) {
        let serialized = match serde_json::to_vec(&event.data) {
            Ok(bytes) => bytes,
            Err(_) => return,
        };
        if serialized.len() <= self.config.large_event_threshold_bytes {
            return;
        }
        use flate2::Compression;
        use flate2::write::GzEncoder;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        if encoder.write_all(&serialized).is_err() {
            return;
        }
        let Ok(compressed) = encoder.finish() else {
            return;
        };
        event.compressed_payload = Some(compressed);
        event.data = serde_json::Value::Null;
        event.metadata.compressed = true;
    }

    fn decompress(&self, mut event: Event) -> Event {
        if !event.metadata.compressed {
            return event;
        }
        let Some(compressed) = event.compressed_payload.take() else {
            return event;
        };
        use flate2::read::GzDecoder;
        let mut decoder = GzDecoder::new(&compressed[..]);
        let mut raw = Vec::new();
        if decoder.read_to_end(&mut raw).is_err() {
            event.compressed_payload = Some(compressed);
            return event;
        }
        if let Ok(value) = serde_json::from_slice(&raw) {
            event.data = value;
        }
        // Keep `metadata.compressed = true` as a historical marker (spec S6
        // expects it observable post-dispatch) and the original bytes, so a
        // second decompress attempt stays idempotent.
        event.compressed_payload = Some(compressed);
        event
    }
}

/// Event types that are always allowed through backpressure/depth checks
/// even from non-critical producers (re-exported for callers building their
/// own producer gating on top of `enqueue`).
pub fn is_flush_critical_type(event_type: &str) -> bool {
    event_type::FLUSH_CRITICAL.contains(&event_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn small_event() -> Event {
        Event::new("agent.action.start", json!({"n": 1}))
    }

    #[test]
    fn rejects_enqueue_at_max_depth_for_non_critical_producer() {
        let queue = EventQueue::new(QueueConfig {
            max_queue_depth: 2,
            high_watermark: 100,
            low_watermark: 0,
            ..QueueConfig::default()
        });
        assert!(queue.enqueue(small_event(), false).0.success);
        assert!(queue.enqueue(small_event(), false).0.success);
        let (outcome, _) = queue.enqueue(small_event(), false);
        assert!(!outcome.success);
    }

    #[test]
    fn flush_critical_types_bypass_depth_cap() {
        let queue = EventQueue::new(QueueConfig {
            max_queue_depth: 1,
            high_watermark: 100,
            low_watermark: 0,
            ..QueueConfig::default()
        });
        assert!(queue.enqueue(small_event(), false).0.success);
        let critical = Event::new(event_type::KERNEL_FAILED, json!({}));
        let (outcome, _) = queue.enqueue(critical, false);
        assert!(outcome.success);
    }

    #[test]
    fn priority_drains_before_lower_priorities() {
        let queue = EventQueue::new(QueueConfig::default());
        queue.enqueue(small_event().with_priority(Priority::Low), false);
        queue.enqueue(small_event().with_priority(Priority::Critical), false);
        let popped = queue.pop().unwrap();
        assert_eq!(popped.priority, Priority::Critical);
    }

    #[test]
    fn backpressure_flag_raises_and_clears() {
        let queue = EventQueue::new(QueueConfig {
            max_queue_depth: 100,
            high_watermark: 2,
            low_watermark: 1,
            ..QueueConfig::default()
        });
        queue.enqueue(small_event(), false);
        queue.enqueue(small_event(), false);
        assert!(queue.backpressure_active());
        queue.pop();
        queue.pop();
        assert!(!queue.backpressure_active());
    }

    #[test]
    fn large_payloads_are_compressed_and_transparently_restored() {
        let queue = EventQueue::new(QueueConfig {
            large_event_threshold_bytes: 16,
            ..QueueConfig::default()
        });
        let payload = json!({"blob": "x".repeat(1000)});
        let event = Event::new("agent.tool.completed", payload.clone());
        queue.enqueue(event, false);
        let popped = queue.pop().unwrap();
        assert!(popped.metadata.compressed);
        assert_eq!(popped.data, payload);
    }

    #[tokio::test]
    async fn nack_retries_then_moves_to_dlq() {
        let queue = EventQueue::new(QueueConfig {
            max_retries: 0,
            base_backoff_ms: 1,
            max_backoff_ms: 1,
            ..QueueConfig::default()
        });
        let event = small_event().with_delivery_guarantee(DeliveryGuarantee::AtLeastOnce);
        let (_, event_id) = queue.enqueue(event, false);
        queue.pop();
        queue.nack(&event_id, "boom".into());
        // max_retries=0 => first nack exceeds budget immediately.
        assert_eq!(queue.dlq().len(), 1);
    }
}
