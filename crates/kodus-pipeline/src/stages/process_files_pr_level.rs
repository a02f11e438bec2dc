//! Stage 6: ProcessFilesPrLevelReview — run PR-level rules and cross-file
//! analysis (spec §4.10).

use crate::collaborators::PrLevelAnalyzer;
use crate::error::PipelineError;
use crate::stage::{Stage, StageResult};
use async_trait::async_trait;
use kodus_contracts::pipeline::PipelineContext;
use std::sync::Arc;

pub struct ProcessFilesPrLevelReviewStage {
    analyzer: Arc<dyn PrLevelAnalyzer>,
}

impl ProcessFilesPrLevelReviewStage {
    pub fn new(analyzer: Arc<dyn PrLevelAnalyzer>) -> Self {
        Self { analyzer }
    }
}

#[async_trait]
impl Stage for ProcessFilesPrLevelReviewStage {
    fn name(&self) -> &'static str {
        "ProcessFilesPrLevelReview"
    }

    async fn run(&self, ctx: PipelineContext) -> StageResult {
        match self.analyzer.analyze(&ctx.changed_files).await {
            Ok(comments) => {
                let mut next = ctx;
                next.overall_comments.extend(comments);
                Ok(next)
            }
            Err(err) => Err((PipelineError::Internal(err.to_string()), ctx)),
        }
    }
}
