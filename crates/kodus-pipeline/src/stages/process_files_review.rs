//! Stage 7: ProcessFilesReview — batch files (20-30 per batch), per batch
//! execute file-level analysis with bounded concurrency (<=20 files in
//! flight), then merge outputs (spec §4.10, §5).
//!
//! Grounded on `restflow-tools/src/impls/batch.rs`'s `Semaphore` +
//! `FuturesOrdered` pattern for bounded-concurrency fan-out.

use crate::collaborators::{CrossFileAnalyzer, KodyFineTuningFilter, SafeguardVerifier};
use crate::config::PipelineConfig;
use crate::filters;
use crate::filters::{CodeReviewVersion, PreviousSuggestionsStore};
use crate::stage::{Stage, StageResult};
use async_trait::async_trait;
use futures::stream::{FuturesOrdered, StreamExt};
use kodus_contracts::pipeline::{ChangedFile, PipelineContext, Suggestion};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Produces raw LLM suggestions for one file. One call == one "chunk" for
/// the retry policy in spec §4.10 ("Each LLM chunk carries an independent
/// retry with exponential backoff").
#[async_trait]
pub trait FileAnalyzer: Send + Sync {
    async fn analyze(&self, file: &ChangedFile, config: &serde_json::Value) -> anyhow::Result<Vec<Suggestion>>;
}

pub struct ProcessFilesReviewStage {
    analyzer: Arc<dyn FileAnalyzer>,
    kody_filter: Arc<dyn KodyFineTuningFilter>,
    safeguard: Arc<dyn SafeguardVerifier>,
    cross_file_analyzer: Arc<dyn CrossFileAnalyzer>,
    previous_suggestions: Arc<dyn PreviousSuggestionsStore>,
    config: PipelineConfig,
    code_review_version: CodeReviewVersion,
    allowed_categories: Vec<String>,
}

impl ProcessFilesReviewStage {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        analyzer: Arc<dyn FileAnalyzer>,
        kody_filter: Arc<dyn KodyFineTuningFilter>,
        safeguard: Arc<dyn SafeguardVerifier>,
        cross_file_analyzer: Arc<dyn CrossFileAnalyzer>,
        previous_suggestions: Arc<dyn PreviousSuggestionsStore>,
        config: PipelineConfig,
        code_review_version: CodeReviewVersion,
        allowed_categories: Vec<String>,
    ) -> Self {
        Self {
            analyzer,
            kody_filter,
            safeguard,
            cross_file_analyzer,
            previous_suggestions,
            config,
            code_review_version,
            allowed_categories,
        }
    }

    /// Calls the analyzer with exponential backoff; on exhaustion, degrades
    /// gracefully to an empty suggestion set for that file (spec §4.10
    /// "failures degrade gracefully to an empty suggestion set for that
    /// chunk").
    async fn analyze_with_retry(&self, file: &ChangedFile, resolved_config: &serde_json::Value) -> Vec<Suggestion> {
        let mut attempt = 0u32;
        loop {
            match self.analyzer.analyze(file, resolved_config).await {
                Ok(suggestions) => return suggestions,
                Err(err) => {
                    attempt += 1;
                    if attempt >= self.config.llm_retry_attempts {
                        tracing::warn!(file = %file.path, error = %err, attempts = attempt, "llm chunk exhausted retries, degrading to empty suggestions");
                        return Vec::new();
                    }
                    let delay_ms = (100u64 * 2u64.pow(attempt)).min(self.config.llm_retry_max_delay_ms);
                    tracing::warn!(file = %file.path, error = %err, attempt, delay_ms, "llm chunk failed, retrying");
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
            }
        }
    }

    async fn process_file(
        &self,
        file: &ChangedFile,
        resolved_config: &serde_json::Value,
        pr_number: u64,
        is_update_event: bool,
        cross_file: &[Suggestion],
    ) -> Vec<Suggestion> {
        let raw = self.analyze_with_retry(file, resolved_config).await; // step 1: ids assigned by Suggestion::new
        let filtered = filters::filter_by_review_options(raw, &self.allowed_categories); // step 2
        let filtered = filters::filter_by_diff_intersection(filtered, file); // step 3
        let filtered = filters::apply_kody_fine_tuning(self.kody_filter.as_ref(), filtered); // step 4
        let filtered = filters::prioritize_by_severity(filtered, self.code_review_version); // step 5
        let filtered = match filters::apply_safeguard(self.safeguard.as_ref(), filtered).await {
            // step 6
            Ok(verified) => verified,
            Err(err) => {
                tracing::warn!(file = %file.path, error = %err, "safeguard verification failed, keeping unverified suggestions");
                Vec::new()
            }
        };
        let cross_file_for_file: Vec<Suggestion> = cross_file.iter().filter(|s| s.file_path == file.path).cloned().collect();
        let merged = filters::merge_additional_suggestions(filtered, Vec::new(), Vec::new(), cross_file_for_file); // step 7

        let merged = if is_update_event {
            // step 8: suppress duplicates of previously sent, not-implemented suggestions.
            let previously_sent = self.previous_suggestions.not_yet_implemented(pr_number, &file.path).await;
            filters::suppress_duplicates_of_unimplemented(merged, &previously_sent)
        } else {
            merged
        };

        filters::compute_rank_scores(merged) // step 9
    }

    async fn process_batch(
        &self,
        batch: &[ChangedFile],
        resolved_config: &serde_json::Value,
        pr_number: u64,
        is_update_event: bool,
        cross_file: &[Suggestion],
    ) -> Vec<Suggestion> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_files));
        let mut ordered = FuturesOrdered::new();

        for file in batch {
            let sem = semaphore.clone();
            ordered.push_back(async move {
                let _permit = sem.acquire().await.expect("semaphore is never closed");
                self.process_file(file, resolved_config, pr_number, is_update_event, cross_file).await
            });
        }

        let mut results = Vec::new();
        while let Some(suggestions) = ordered.next().await {
            results.extend(suggestions);
        }
        results
    }
}

#[async_trait]
impl Stage for ProcessFilesReviewStage {
    fn name(&self) -> &'static str {
        "ProcessFilesReview"
    }

    async fn run(&self, ctx: PipelineContext) -> StageResult {
        // The analyzer resolves its own per-directory slice out of the full
        // map; directory matching is the analyzer's concern, not this stage's.
        let resolved_config = serde_json::to_value(&ctx.resolved_config).unwrap_or(serde_json::json!({}));
        let cross_file = self.cross_file_analyzer.analyze(&ctx.changed_files).await.unwrap_or_default();
        let pr_number = ctx.pull_request.number;
        let is_update_event = ctx.pull_request.is_update_event;

        let mut all_suggestions = Vec::new();
        for batch in &ctx.file_batches {
            let batch_suggestions = self.process_batch(batch, &resolved_config, pr_number, is_update_event, &cross_file).await;
            all_suggestions.extend(batch_suggestions);
        }

        let mut next = ctx;
        next.valid_suggestions = all_suggestions;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{NoopCrossFileAnalyzer, NoopKodyFilter, NoopSafeguard};
    use crate::filters::InMemoryPreviousSuggestionsStore;
    use kodus_contracts::pipeline::{Hunk, OrganizationAndTeamData, PullRequest, Repository};

    fn ctx_with_files(files: Vec<ChangedFile>) -> PipelineContext {
        let mut ctx = PipelineContext::new(
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
        );
        ctx.file_batches = vec![files.clone()];
        ctx.changed_files = files;
        ctx
    }

    struct AlwaysOneSuggestion;
    #[async_trait]
    impl FileAnalyzer for AlwaysOneSuggestion {
        async fn analyze(&self, file: &ChangedFile, _config: &serde_json::Value) -> anyhow::Result<Vec<Suggestion>> {
            Ok(vec![Suggestion::new(&file.path, 3, "bug", "looks off")])
        }
    }

    struct AlwaysFails;
    #[async_trait]
    impl FileAnalyzer for AlwaysFails {
        async fn analyze(&self, _file: &ChangedFile, _config: &serde_json::Value) -> anyhow::Result<Vec<Suggestion>> {
            anyhow::bail!("llm unavailable")
        }
    }

    fn stage(analyzer: Arc<dyn FileAnalyzer>) -> ProcessFilesReviewStage {
        ProcessFilesReviewStage::new(
            analyzer,
            Arc::new(NoopKodyFilter),
            Arc::new(NoopSafeguard),
            Arc::new(NoopCrossFileAnalyzer),
            InMemoryPreviousSuggestionsStore::new(),
            PipelineConfig { llm_retry_attempts: 2, ..PipelineConfig::default() },
            CodeReviewVersion::V1,
            vec![],
        )
    }

    #[tokio::test]
    async fn suggestions_on_changed_lines_survive_the_pipeline() {
        let file = ChangedFile {
            path: "src/lib.rs".into(),
            additions: 1,
            deletions: 0,
            hunks: vec![Hunk { start_line: 1, line_count: 10 }],
            patch: String::new(),
        };
        let result = stage(Arc::new(AlwaysOneSuggestion)).run(ctx_with_files(vec![file])).await.unwrap();
        assert_eq!(result.valid_suggestions.len(), 1);
        assert!(result.valid_suggestions[0].rank_score.is_some());
    }

    #[tokio::test]
    async fn failing_analyzer_degrades_to_empty_suggestions_not_stage_failure() {
        let file = ChangedFile {
            path: "src/lib.rs".into(),
            additions: 1,
            deletions: 0,
            hunks: vec![Hunk { start_line: 1, line_count: 10 }],
            patch: String::new(),
        };
        let result = stage(Arc::new(AlwaysFails)).run(ctx_with_files(vec![file])).await.unwrap();
        assert!(result.valid_suggestions.is_empty());
        assert!(!result.is_skipped());
    }
}
