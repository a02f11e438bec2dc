//! Stage 9: CreateFileComments — materialize line comments; auto-resolve
//! prior comments whose suggestions were implemented (spec §4.10).

use crate::collaborators::PlatformClient;
use crate::filters::{self, PreviousSuggestionsStore};
use crate::stage::{Stage, StageResult};
use async_trait::async_trait;
use kodus_contracts::pipeline::{Comment, PipelineContext};
use std::sync::Arc;

pub struct CreateFileCommentsStage {
    platform: Arc<dyn PlatformClient>,
    previous_suggestions: Arc<dyn PreviousSuggestionsStore>,
}

impl CreateFileCommentsStage {
    pub fn new(platform: Arc<dyn PlatformClient>, previous_suggestions: Arc<dyn PreviousSuggestionsStore>) -> Self {
        Self { platform, previous_suggestions }
    }
}

#[async_trait]
impl Stage for CreateFileCommentsStage {
    fn name(&self) -> &'static str {
        "CreateFileComments"
    }

    async fn run(&self, ctx: PipelineContext) -> StageResult {
        let line_comments: Vec<Comment> = ctx
            .valid_suggestions
            .iter()
            .filter(|s| !s.cross_file)
            .map(|s| Comment {
                body: s.body.clone(),
                file_path: Some(s.file_path.clone()),
                line: Some(s.line),
            })
            .collect();

        for comment in &line_comments {
            if let Err(err) = self.platform.post_line_comment(&ctx.pull_request, comment).await {
                tracing::warn!(error = %err, "failed to post line comment");
            }
        }

        if ctx.pull_request.is_update_event {
            for file in &ctx.changed_files {
                let previously_sent = self.previous_suggestions.not_yet_implemented(ctx.pull_request.number, &file.path).await;
                for implemented in filters::implemented_suggestions(&previously_sent, file) {
                    if let Err(err) = self.platform.auto_resolve_implemented_comment(&ctx.pull_request, &implemented.id).await {
                        tracing::warn!(error = %err, suggestion_id = %implemented.id, "failed to auto-resolve implemented comment");
                    }
                }
            }
        }

        let mut next = ctx;
        next.line_comments.extend(line_comments);
        Ok(next)
    }
}
