//! Stage 10: AggregateResults — fold per-file results into the pipeline
//! context and mark the run as a success if nothing short-circuited it
//! (spec §4.10).

use crate::stage::{Stage, StageResult};
use async_trait::async_trait;
use kodus_contracts::pipeline::{PipelineContext, PipelineStatus};

pub struct AggregateResultsStage;

#[async_trait]
impl Stage for AggregateResultsStage {
    fn name(&self) -> &'static str {
        "AggregateResults"
    }

    async fn run(&self, ctx: PipelineContext) -> StageResult {
        let mut next = ctx;
        if matches!(next.status, PipelineStatus::Running) {
            next.status = PipelineStatus::Success;
        }
        next.file_metadata.insert(
            "aggregate_summary".to_string(),
            serde_json::json!({
                "files_analyzed": next.changed_files.len(),
                "valid_suggestions": next.valid_suggestions.len(),
                "discarded_suggestions": next.discarded_suggestions.len(),
                "pr_level_comments": next.pr_level_comments.len(),
                "line_comments": next.line_comments.len(),
            }),
        );
        Ok(next)
    }
}
