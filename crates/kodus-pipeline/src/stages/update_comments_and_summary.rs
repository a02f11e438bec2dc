//! Stage 11: UpdateCommentsAndGenerateSummary — optionally updates the
//! initial comment with a summary (spec §4.10).

use crate::collaborators::PlatformClient;
use crate::stage::{Stage, StageResult};
use async_trait::async_trait;
use kodus_contracts::pipeline::PipelineContext;
use std::sync::Arc;

pub struct UpdateCommentsAndGenerateSummaryStage {
    platform: Arc<dyn PlatformClient>,
    enabled: bool,
}

impl UpdateCommentsAndGenerateSummaryStage {
    pub fn new(platform: Arc<dyn PlatformClient>, enabled: bool) -> Self {
        Self { platform, enabled }
    }

    fn summarize(ctx: &PipelineContext) -> String {
        format!(
            "{} suggestion(s) across {} file(s) ({} PR-level, {} line comments).",
            ctx.valid_suggestions.len(),
            ctx.changed_files.len(),
            ctx.pr_level_comments.len(),
            ctx.line_comments.len(),
        )
    }
}

#[async_trait]
impl Stage for UpdateCommentsAndGenerateSummaryStage {
    fn name(&self) -> &'static str {
        "UpdateCommentsAndGenerateSummary"
    }

    async fn run(&self, ctx: PipelineContext) -> StageResult {
        if !self.enabled {
            return Ok(ctx);
        }
        let summary = Self::summarize(&ctx);
        if let Err(err) = self.platform.update_initial_comment(&ctx.pull_request, &summary).await {
            tracing::warn!(error = %err, "failed to update initial comment with summary");
        }
        Ok(ctx)
    }
}
