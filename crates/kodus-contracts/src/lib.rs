//! Shared boundary types for the agent execution core.
//!
//! Nothing in this crate executes anything; it only defines the data that
//! crosses crate boundaries (`kodus-kernel`, `kodus-manager`, `kodus-agent`,
//! `kodus-pipeline`). Keeping these types dependency-free of logic lets every
//! other crate depend on them without pulling in tokio or I/O concerns.

pub mod context;
pub mod event;
pub mod kernel;
pub mod message;
pub mod multiagent;
pub mod pipeline;
pub mod plan;
pub mod snapshot;

pub use context::{ExecutionContext, StrategySelector};
pub use event::{DeliveryGuarantee, Event, EventMetadata, Priority};
pub use kernel::{KernelState, KernelStatus, Quotas};
pub use message::{Message, Role};
pub use multiagent::{Capability, Delegation, TrackedMessage};
pub use pipeline::{PipelineContext, PipelineStatus, SkipReason};
pub use plan::{Plan, PlanStatus, Step, StepId, StepKind};
pub use snapshot::Snapshot;
