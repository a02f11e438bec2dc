//! Stage 1: ValidateNewCommits — detect whether there is anything new since
//! the last analyzed commit (spec §4.10).

use crate::stage::{Stage, StageResult};
use async_trait::async_trait;
use dashmap::DashMap;
use kodus_contracts::pipeline::{PipelineContext, SkipReason};
use std::sync::Arc;

/// Tracks the last commit sha analyzed per pull request. Out of scope per
/// §1 (a storage adapter); `InMemoryLastAnalyzedCommitStore` is adequate
/// for tests, real callers back it with the same store as sessions/snapshots.
#[async_trait]
pub trait LastAnalyzedCommitStore: Send + Sync {
    async fn last_analyzed_sha(&self, pull_request_key: &str) -> Option<String>;
    async fn set_last_analyzed_sha(&self, pull_request_key: &str, sha: String);
}

#[derive(Default)]
pub struct InMemoryLastAnalyzedCommitStore {
    shas: DashMap<String, String>,
}

impl InMemoryLastAnalyzedCommitStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl LastAnalyzedCommitStore for InMemoryLastAnalyzedCommitStore {
    async fn last_analyzed_sha(&self, pull_request_key: &str) -> Option<String> {
        self.shas.get(pull_request_key).map(|e| e.value().clone())
    }

    async fn set_last_analyzed_sha(&self, pull_request_key: &str, sha: String) {
        self.shas.insert(pull_request_key.to_string(), sha);
    }
}

pub struct ValidateNewCommitsStage {
    store: Arc<dyn LastAnalyzedCommitStore>,
}

impl ValidateNewCommitsStage {
    pub fn new(store: Arc<dyn LastAnalyzedCommitStore>) -> Self {
        Self { store }
    }

    fn pr_key(ctx: &PipelineContext) -> String {
        format!("{}#{}", ctx.repository.id, ctx.pull_request.number)
    }
}

#[async_trait]
impl Stage for ValidateNewCommitsStage {
    fn name(&self) -> &'static str {
        "ValidateNewCommits"
    }

    async fn run(&self, ctx: PipelineContext) -> StageResult {
        let key = Self::pr_key(&ctx);
        let last_sha = self.store.last_analyzed_sha(&key).await;

        if last_sha.as_deref() == Some(ctx.pull_request.head_sha.as_str()) {
            return Ok(ctx.skip(SkipReason::ProcessingInProgress, "no new commits since the last analyzed head".to_string()));
        }

        self.store.set_last_analyzed_sha(&key, ctx.pull_request.head_sha.clone()).await;
        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kodus_contracts::pipeline::{OrganizationAndTeamData, PullRequest, Repository};

    fn ctx(head_sha: &str) -> PipelineContext {
        PipelineContext::new(
            OrganizationAndTeamData { organization_id: "org".into(), team_id: "team".into() },
            Repository { id: "repo-1".into(), full_name: "acme/widgets".into(), default_branch: "main".into() },
            PullRequest {
                number: 7,
                title: "t".into(),
                base_branch: "main".into(),
                head_branch: "feat".into(),
                head_sha: head_sha.into(),
                is_update_event: true,
            },
        )
    }

    #[tokio::test]
    async fn first_run_processes_and_records_sha() {
        let store = InMemoryLastAnalyzedCommitStore::new();
        let stage = ValidateNewCommitsStage::new(store.clone());
        let result = stage.run(ctx("sha-1")).await.unwrap();
        assert!(!result.is_skipped());
        assert_eq!(store.last_analyzed_sha("repo-1#7").await, Some("sha-1".to_string()));
    }

    #[tokio::test]
    async fn rerun_on_same_head_sha_is_skipped() {
        let store = InMemoryLastAnalyzedCommitStore::new();
        store.set_last_analyzed_sha("repo-1#7", "sha-1".to_string()).await;
        let stage = ValidateNewCommitsStage::new(store);
        let result = stage.run(ctx("sha-1")).await.unwrap();
        assert!(result.is_skipped());
    }

    #[tokio::test]
    async fn new_head_sha_processes() {
        let store = InMemoryLastAnalyzedCommitStore::new();
        store.set_last_analyzed_sha("repo-1#7", "sha-1".to_string()).await;
        let stage = ValidateNewCommitsStage::new(store);
        let result = stage.run(ctx("sha-2")).await.unwrap();
        assert!(!result.is_skipped());
    }
}
