//! Error kinds for the kernel crate (spec §7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum KernelError {
    #[error("queue is full")]
    QueueFull,
    #[error("backpressure active, producer rejected")]
    Backpressure,
    #[error("operation `{0}` already in flight (idempotent no-op)")]
    DuplicateOperation(String),
    #[error("too many concurrent operations (max {0})")]
    TooManyOperations(usize),
    #[error("operation `{0}` timed out")]
    OperationTimeout(String),
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),
    #[error("invalid kernel state: {0}")]
    StateInvalid(String),
    #[error("persistence error: {0}")]
    Persistence(#[from] kodus_traits::store::StoreError),
    #[error("internal error: {0}")]
    Internal(String),
}

pub type KernelResult<T> = Result<T, KernelError>;
