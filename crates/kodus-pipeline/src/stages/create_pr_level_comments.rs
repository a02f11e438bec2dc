//! Stage 8: CreatePrLevelComments — materialize PR-level suggestion
//! comments (spec §4.10).

use crate::collaborators::PlatformClient;
use crate::stage::{Stage, StageResult};
use async_trait::async_trait;
use kodus_contracts::pipeline::{Comment, PipelineContext};
use std::sync::Arc;

pub struct CreatePrLevelCommentsStage {
    platform: Arc<dyn PlatformClient>,
}

impl CreatePrLevelCommentsStage {
    pub fn new(platform: Arc<dyn PlatformClient>) -> Self {
        Self { platform }
    }
}

#[async_trait]
impl Stage for CreatePrLevelCommentsStage {
    fn name(&self) -> &'static str {
        "CreatePrLevelComments"
    }

    async fn run(&self, ctx: PipelineContext) -> StageResult {
        let cross_file_comments: Vec<Comment> = ctx
            .valid_suggestions
            .iter()
            .filter(|s| s.cross_file)
            .map(|s| Comment {
                body: s.body.clone(),
                file_path: Some(s.file_path.clone()),
                line: Some(s.line),
            })
            .collect();

        for comment in cross_file_comments.iter().chain(ctx.overall_comments.iter()) {
            if let Err(err) = self.platform.post_pr_level_comment(&ctx.pull_request, comment).await {
                tracing::warn!(error = %err, "failed to post pr-level comment");
            }
        }

        let mut next = ctx;
        next.pr_level_comments.extend(cross_file_comments);
        Ok(next)
    }
}
