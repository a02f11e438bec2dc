//! Stage 3: ValidateConfig — applies the review-cadence policy (spec §4.10
//! "Review cadence").

use crate::cadence::{self, CadenceMode, CadenceStore, ReviewOrigin};
use crate::collaborators::PlatformClient;
use crate::config::PipelineConfig;
use crate::stage::{Stage, StageResult};
use async_trait::async_trait;
use kodus_contracts::pipeline::{PipelineContext, SkipReason};
use std::sync::Arc;

pub struct ValidateConfigStage {
    store: Arc<dyn CadenceStore>,
    platform: Arc<dyn PlatformClient>,
    config: PipelineConfig,
    mode: CadenceMode,
}

impl ValidateConfigStage {
    pub fn new(store: Arc<dyn CadenceStore>, platform: Arc<dyn PlatformClient>, config: PipelineConfig, mode: CadenceMode) -> Self {
        Self { store, platform, config, mode }
    }

    fn origin(ctx: &PipelineContext) -> ReviewOrigin {
        match ctx.file_metadata.get("_origin").and_then(|v| v.as_str()) {
            Some("command") => ReviewOrigin::Command,
            _ => ReviewOrigin::Push,
        }
    }
}

#[async_trait]
impl Stage for ValidateConfigStage {
    fn name(&self) -> &'static str {
        "ValidateConfig"
    }

    async fn run(&self, ctx: PipelineContext) -> StageResult {
        let repo_id = ctx.repository.id.clone();
        let origin = Self::origin(&ctx);
        let current_status = self.store.current_status(&repo_id).await;
        let has_prior = self.store.has_prior_successful_review(&repo_id).await;
        let since = chrono::Utc::now() - chrono::Duration::minutes(self.config.time_window_minutes);
        let reviews_in_window = self.store.successful_reviews_since(&repo_id, since).await;

        let decision = cadence::decide(origin, self.mode, current_status, has_prior, reviews_in_window, self.config.pushes_to_trigger);
        self.store.set_status(&repo_id, decision.new_status).await;

        if !decision.should_process {
            let reason = decision.skip_reason.expect("skip decisions always carry a reason");
            if reason == SkipReason::PrPausedBurstPushes {
                if let Err(err) = self.platform.post_pause_comment(&ctx.pull_request).await {
                    tracing::warn!(error = %err, "failed to post cadence pause comment");
                }
            }
            return Ok(ctx.skip(reason, None));
        }

        Ok(ctx)
    }
}
