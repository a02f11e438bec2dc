//! LRU cache, event queue, runtime dispatcher, and execution kernel
//! (spec §4.1, §4.3, §4.4, §4.5).

pub mod cache;
pub mod error;
pub mod kernel;
pub mod queue;
pub mod runtime;

pub use cache::{CacheStats, LruCache, cache_key};
pub use error::{KernelError, KernelResult};
pub use kernel::{ExecutionKernel, KernelConfig};
pub use kernel::atomic_gate::AtomicOperationGate;
pub use kernel::quotas::{QuotaKind, check_quotas};
pub use queue::{DeadLetterQueue, DlqEntry, EnqueueOutcome, EventQueue, QueueConfig, ReprocessCriteria};
pub use runtime::{EmitOptions, EventHandler, Middleware, ProcessStats, Runtime};
