//! Stage 5: InitialComment — minimize the previous review comment
//! (platform-specific) and post a start-review message if configured
//! (spec §4.10).

use crate::collaborators::PlatformClient;
use crate::error::PipelineError;
use crate::stage::{Stage, StageResult};
use async_trait::async_trait;
use kodus_contracts::pipeline::PipelineContext;
use std::sync::Arc;

pub struct InitialCommentStage {
    platform: Arc<dyn PlatformClient>,
    post_start_review_comment: bool,
}

impl InitialCommentStage {
    pub fn new(platform: Arc<dyn PlatformClient>, post_start_review_comment: bool) -> Self {
        Self { platform, post_start_review_comment }
    }
}

#[async_trait]
impl Stage for InitialCommentStage {
    fn name(&self) -> &'static str {
        "InitialComment"
    }

    async fn run(&self, ctx: PipelineContext) -> StageResult {
        if let Err(err) = self.platform.minimize_previous_review_comment(&ctx.pull_request).await {
            return Err((PipelineError::Platform(err.to_string()), ctx));
        }

        if self.post_start_review_comment {
            if let Err(err) = self.platform.post_start_review_comment(&ctx.pull_request).await {
                return Err((PipelineError::Platform(err.to_string()), ctx));
            }
        }

        Ok(ctx)
    }
}
