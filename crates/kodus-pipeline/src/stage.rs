//! Stage contract and the ordered executor (spec §4.10).
//!
//! Grounded on `restflow-core/src/engine/executor.rs` (ordered execution over
//! a registry) and `restflow-core/src/engine/context.rs` (functional context
//! update via namespaced data).

use crate::error::PipelineError;
use async_trait::async_trait;
use kodus_contracts::pipeline::PipelineContext;

pub type StageResult = Result<PipelineContext, (PipelineError, PipelineContext)>;

/// A single pipeline stage. Implementations must be pure with respect to any
/// input they do not claim to own, and return a new context via functional
/// update rather than mutating a shared one (spec §3 "Ownership").
#[async_trait]
pub trait Stage: Send + Sync {
    /// Stage name, used for logging and test assertions.
    fn name(&self) -> &'static str;

    /// Runs the stage. On success, returns the next context (possibly with
    /// `statusInfo.status = skipped` to short-circuit the remainder). On
    /// failure, returns the error alongside the *original* context so the
    /// executor can continue with "the last good context" (spec: "Errors
    /// from one stage do NOT abort the pipeline").
    async fn run(&self, ctx: PipelineContext) -> StageResult;
}

/// Runs an ordered sequence of stages over a pipeline context.
///
/// Invariant (spec §8 property 5): if any stage raises an error, the
/// `pipeline_id` stamped on the initial context is unchanged and the
/// remaining stages still execute, unless a stage explicitly sets
/// `statusInfo.status = skipped`.
pub struct PipelineExecutor {
    stages: Vec<Box<dyn Stage>>,
}

impl PipelineExecutor {
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Self {
        Self { stages }
    }

    pub async fn run(&self, mut ctx: PipelineContext) -> PipelineContext {
        let pipeline_id = ctx.pipeline_metadata.pipeline_id.clone();

        for stage in &self.stages {
            tracing::info!(pipeline_id = %pipeline_id, stage = stage.name(), "running pipeline stage");
            match stage.run(ctx).await {
                Ok(next) => {
                    let skipped = next.is_skipped();
                    ctx = next;
                    if skipped {
                        tracing::info!(pipeline_id = %pipeline_id, stage = stage.name(), "stage short-circuited the pipeline");
                        break;
                    }
                }
                Err((err, previous)) => {
                    tracing::warn!(pipeline_id = %pipeline_id, stage = stage.name(), error = %err, "stage failed; continuing with last good context");
                    ctx = previous;
                }
            }
        }

        debug_assert_eq!(ctx.pipeline_metadata.pipeline_id, pipeline_id);
        ctx
    }
}
