use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("unknown namespace: {0}")]
    UnknownNamespace(String),
    #[error("duplicate kernel id: {0}")]
    DuplicateKernel(String),
    #[error("target kernel for namespace {0} is not running")]
    TargetNotRunning(String),
    #[error(transparent)]
    Kernel(#[from] kodus_kernel::KernelError),
}

pub type ManagerResult<T> = Result<T, ManagerError>;
