//! Stage 12: RequestChangesOrApprove — request changes if any critical-
//! severity comment exists; else approve if no comments remain and policy
//! allows; never overwrite an existing CHANGES_REQUESTED state (spec §4.10).

use crate::collaborators::PlatformClient;
use crate::stage::{Stage, StageResult};
use async_trait::async_trait;
use kodus_contracts::pipeline::{PipelineContext, Severity};
use std::sync::Arc;

pub struct RequestChangesOrApproveStage {
    platform: Arc<dyn PlatformClient>,
    approve_when_clean: bool,
}

impl RequestChangesOrApproveStage {
    pub fn new(platform: Arc<dyn PlatformClient>, approve_when_clean: bool) -> Self {
        Self { platform, approve_when_clean }
    }
}

#[async_trait]
impl Stage for RequestChangesOrApproveStage {
    fn name(&self) -> &'static str {
        "RequestChangesOrApprove"
    }

    async fn run(&self, ctx: PipelineContext) -> StageResult {
        let already_requested = match self.platform.has_changes_requested(&ctx.pull_request).await {
            Ok(v) => v,
            Err(err) => {
                tracing::warn!(error = %err, "failed to read existing review state; skipping request/approve");
                return Ok(ctx);
            }
        };

        let has_critical = ctx.valid_suggestions.iter().any(|s| s.severity == Severity::Critical);

        if has_critical {
            if !already_requested {
                if let Err(err) = self.platform.request_changes(&ctx.pull_request).await {
                    tracing::warn!(error = %err, "failed to request changes");
                }
            }
        } else if ctx.valid_suggestions.is_empty() && self.approve_when_clean && !already_requested {
            if let Err(err) = self.platform.approve(&ctx.pull_request).await {
                tracing::warn!(error = %err, "failed to approve pull request");
            }
        }

        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kodus_contracts::pipeline::{Comment, OrganizationAndTeamData, PullRequest, Repository, Suggestion};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn ctx() -> PipelineContext {
        PipelineContext::new(
            OrganizationAndTeamData { organization_id: "org".into(), team_id: "team".into() },
            Repository { id: "repo-1".into(), full_name: "acme/widgets".into(), default_branch: "main".into() },
            PullRequest {
                number: 1,
                title: "t".into(),
                base_branch: "main".into(),
                head_branch: "feat".into(),
                head_sha: "sha".into(),
                is_update_event: false,
            },
        )
    }

    #[derive(Default)]
    struct RecordingPlatform {
        changes_requested: AtomicUsize,
        approved: AtomicUsize,
        existing_changes_requested: AtomicBool,
    }

    #[async_trait]
    impl PlatformClient for RecordingPlatform {
        async fn minimize_previous_review_comment(&self, _pr: &PullRequest) -> anyhow::Result<()> {
            Ok(())
        }
        async fn post_start_review_comment(&self, _pr: &PullRequest) -> anyhow::Result<()> {
            Ok(())
        }
        async fn post_pr_level_comment(&self, _pr: &PullRequest, _c: &Comment) -> anyhow::Result<()> {
            Ok(())
        }
        async fn post_line_comment(&self, _pr: &PullRequest, _c: &Comment) -> anyhow::Result<()> {
            Ok(())
        }
        async fn auto_resolve_implemented_comment(&self, _pr: &PullRequest, _id: &str) -> anyhow::Result<()> {
            Ok(())
        }
        async fn update_initial_comment(&self, _pr: &PullRequest, _summary: &str) -> anyhow::Result<()> {
            Ok(())
        }
        async fn request_changes(&self, _pr: &PullRequest) -> anyhow::Result<()> {
            self.changes_requested.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        async fn approve(&self, _pr: &PullRequest) -> anyhow::Result<()> {
            self.approved.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        async fn post_pause_comment(&self, _pr: &PullRequest) -> anyhow::Result<()> {
            Ok(())
        }
        async fn has_changes_requested(&self, _pr: &PullRequest) -> anyhow::Result<bool> {
            Ok(self.existing_changes_requested.load(Ordering::SeqCst))
        }
    }

    #[tokio::test]
    async fn critical_suggestion_requests_changes() {
        let platform = Arc::new(RecordingPlatform::default());
        let mut context = ctx();
        let mut suggestion = Suggestion::new("f.rs", 1, "bug", "critical issue");
        suggestion.severity = Severity::Critical;
        context.valid_suggestions.push(suggestion);

        let stage = RequestChangesOrApproveStage::new(platform.clone(), true);
        stage.run(context).await.unwrap();
        assert_eq!(platform.changes_requested.load(Ordering::SeqCst), 1);
        assert_eq!(platform.approved.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn no_suggestions_approves_when_policy_allows() {
        let platform = Arc::new(RecordingPlatform::default());
        let stage = RequestChangesOrApproveStage::new(platform.clone(), true);
        stage.run(ctx()).await.unwrap();
        assert_eq!(platform.approved.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn never_overwrites_existing_changes_requested() {
        let platform = Arc::new(RecordingPlatform::default());
        platform.existing_changes_requested.store(true, Ordering::SeqCst);
        let mut context = ctx();
        let mut suggestion = Suggestion::new("f.rs", 1, "bug", "critical issue");
        suggestion.severity = Severity::Critical;
        context.valid_suggestions.push(suggestion);

        let stage = RequestChangesOrApproveStage::new(platform.clone(), true);
        stage.run(context).await.unwrap();
        assert_eq!(platform.changes_requested.load(Ordering::SeqCst), 0);
    }
}
