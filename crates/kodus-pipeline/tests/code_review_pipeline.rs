//! End-to-end scenarios over the full twelve-stage code-review pipeline
//! (spec §8 seed scenario S3, plus a happy-path run).

use async_trait::async_trait;
use kodus_pipeline::collaborators::{
    ChangedFilesSource, ConfigResolver, NoopCrossFileAnalyzer, NoopKodyFilter, NoopPrLevelAnalyzer, NoopSafeguard, PlatformClient,
};
use kodus_pipeline::filters::InMemoryPreviousSuggestionsStore;
use kodus_pipeline::stages::{FileAnalyzer, InMemoryLastAnalyzedCommitStore};
use kodus_pipeline::{build_code_review_pipeline, CadenceMode, CodeReviewCollaborators, CodeReviewVersion, InMemoryCadenceStore, PipelineConfig};
use kodus_contracts::pipeline::{ChangedFile, Comment, Hunk, OrganizationAndTeamData, PipelineContext, PullRequest, Repository, Suggestion};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct FixedConfigResolver;
#[async_trait]
impl ConfigResolver for FixedConfigResolver {
    async fn resolve(&self, _repo: &Repository, _paths: &[String]) -> anyhow::Result<HashMap<String, serde_json::Value>> {
        Ok(HashMap::from([("".to_string(), serde_json::json!({"enabled": true}))]))
    }
}

struct FixedChangedFiles(Vec<ChangedFile>);
#[async_trait]
impl ChangedFilesSource for FixedChangedFiles {
    async fn fetch(&self, _repo: &Repository, _pr: &PullRequest) -> anyhow::Result<Vec<ChangedFile>> {
        Ok(self.0.clone())
    }
}

struct OneSuggestionPerFile;
#[async_trait]
impl FileAnalyzer for OneSuggestionPerFile {
    async fn analyze(&self, file: &ChangedFile, _config: &serde_json::Value) -> anyhow::Result<Vec<Suggestion>> {
        Ok(vec![Suggestion::new(&file.path, 2, "bug", "possible off-by-one")])
    }
}

#[derive(Default)]
struct RecordingPlatform {
    pause_comments: AtomicUsize,
    pr_level_comments: AtomicUsize,
    line_comments: AtomicUsize,
    changes_requested: AtomicUsize,
    approved: AtomicUsize,
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
        self.pr_level_comments.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
    async fn post_line_comment(&self, _pr: &PullRequest, _c: &Comment) -> anyhow::Result<()> {
        self.line_comments.fetch_add(1, Ordering::SeqCst);
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
        self.pause_comments.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
    async fn has_changes_requested(&self, _pr: &PullRequest) -> anyhow::Result<bool> {
        Ok(false)
    }
}

fn pull_request(is_update_event: bool) -> PullRequest {
    PullRequest {
        number: 42,
        title: "add widgets".into(),
        base_branch: "main".into(),
        head_branch: "feature".into(),
        head_sha: "sha-abc".into(),
        is_update_event,
    }
}

fn repo() -> Repository {
    Repository {
        id: "repo-1".into(),
        full_name: "acme/widgets".into(),
        default_branch: "main".into(),
    }
}

fn org() -> OrganizationAndTeamData {
    OrganizationAndTeamData {
        organization_id: "org-1".into(),
        team_id: "team-1".into(),
    }
}

fn changed_file(path: &str) -> ChangedFile {
    ChangedFile {
        path: path.to_string(),
        additions: 5,
        deletions: 1,
        hunks: vec![Hunk { start_line: 1, line_count: 20 }],
        patch: String::new(),
    }
}

#[tokio::test]
async fn happy_path_run_produces_comments_and_requests_changes() {
    let platform = Arc::new(RecordingPlatform::default());
    let collaborators = CodeReviewCollaborators {
        last_analyzed_commits: InMemoryLastAnalyzedCommitStore::new(),
        config_resolver: Arc::new(FixedConfigResolver),
        cadence_store: InMemoryCadenceStore::new(),
        cadence_mode: CadenceMode::Automatic,
        changed_files_source: Arc::new(FixedChangedFiles(vec![changed_file("src/lib.rs"), changed_file("src/main.rs")])),
        platform: platform.clone(),
        post_start_review_comment: true,
        pr_level_analyzer: Arc::new(NoopPrLevelAnalyzer),
        file_analyzer: Arc::new(OneSuggestionPerFile),
        kody_filter: Arc::new(NoopKodyFilter),
        safeguard: Arc::new(NoopSafeguard),
        cross_file_analyzer: Arc::new(NoopCrossFileAnalyzer),
        previous_suggestions: InMemoryPreviousSuggestionsStore::new(),
        code_review_version: CodeReviewVersion::V1,
        allowed_categories: vec![],
        update_summary_enabled: true,
        approve_when_clean: true,
    };

    let executor = build_code_review_pipeline(collaborators, PipelineConfig::default());
    let ctx = PipelineContext::new(org(), repo(), pull_request(false));
    let result = executor.run(ctx).await;

    assert!(!result.is_skipped());
    assert_eq!(result.valid_suggestions.len(), 2);
    assert_eq!(result.line_comments.len(), 2);
    assert_eq!(platform.line_comments.load(Ordering::SeqCst), 2);
    assert_eq!(platform.approved.load(Ordering::SeqCst), 0, "medium-severity suggestions neither approve nor request changes");
}

/// S3: cadence burst pause. `AUTO_PAUSE`, `pushesToTrigger=3`, `timeWindow=15`;
/// three successful executions already seeded in the last 15 minutes.
#[tokio::test]
async fn s3_cadence_burst_pause_skips_and_persists_paused_status() {
    let cadence_store = InMemoryCadenceStore::new();
    cadence_store.record_successful_review("repo-1", chrono::Utc::now()).await;
    cadence_store.record_successful_review("repo-1", chrono::Utc::now()).await;
    cadence_store.record_successful_review("repo-1", chrono::Utc::now()).await;

    let platform = Arc::new(RecordingPlatform::default());
    let collaborators = CodeReviewCollaborators {
        last_analyzed_commits: InMemoryLastAnalyzedCommitStore::new(),
        config_resolver: Arc::new(FixedConfigResolver),
        cadence_store: cadence_store.clone(),
        cadence_mode: CadenceMode::AutoPause,
        changed_files_source: Arc::new(FixedChangedFiles(vec![changed_file("src/lib.rs")])),
        platform: platform.clone(),
        post_start_review_comment: false,
        pr_level_analyzer: Arc::new(NoopPrLevelAnalyzer),
        file_analyzer: Arc::new(OneSuggestionPerFile),
        kody_filter: Arc::new(NoopKodyFilter),
        safeguard: Arc::new(NoopSafeguard),
        cross_file_analyzer: Arc::new(NoopCrossFileAnalyzer),
        previous_suggestions: InMemoryPreviousSuggestionsStore::new(),
        code_review_version: CodeReviewVersion::V1,
        allowed_categories: vec![],
        update_summary_enabled: false,
        approve_when_clean: true,
    };

    let config = PipelineConfig::default().with_cadence(3, 15);
    let executor = build_code_review_pipeline(collaborators, config);
    let ctx = PipelineContext::new(org(), repo(), pull_request(false));
    let result = executor.run(ctx).await;

    assert!(result.is_skipped());
    if let kodus_contracts::pipeline::PipelineStatus::Skipped { reason, .. } = result.status {
        assert_eq!(reason, kodus_contracts::pipeline::SkipReason::PrPausedBurstPushes);
    } else {
        panic!("expected a skipped status");
    }
    assert_eq!(
        kodus_pipeline::CadenceStore::current_status(cadence_store.as_ref(), "repo-1").await,
        kodus_pipeline::CadenceStatus::Paused
    );
    // Pipeline short-circuited before FetchChangedFiles / comment stages ran.
    assert_eq!(platform.line_comments.load(Ordering::SeqCst), 0);
}
