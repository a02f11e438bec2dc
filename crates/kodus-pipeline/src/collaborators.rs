//! External collaborator seams (spec §1 "out of scope ... referenced only
//! via their contracts"): platform integrations (code hosting), per-directory
//! config resolution, and domain-specific rule engines. Each is a trait so
//! the pipeline crate stays free of any concrete hosting/storage dependency;
//! callers supply real implementations, tests supply fakes.

use async_trait::async_trait;
use kodus_contracts::pipeline::{ChangedFile, Comment, PullRequest, Repository, Suggestion};
use serde_json::Value;

/// Locates per-directory review configuration by inspecting changed paths,
/// falling back to repo-level then global config (spec §4.10 stage 2).
#[async_trait]
pub trait ConfigResolver: Send + Sync {
    async fn resolve(
        &self,
        repository: &Repository,
        changed_paths: &[String],
    ) -> anyhow::Result<std::collections::HashMap<String, Value>>;
}

/// Enumerates changed files for a pull request (spec §4.10 stage 4). Ignore
/// globs and per-hunk enrichment are applied by the caller-supplied
/// implementation; this seam only returns the final enriched list.
#[async_trait]
pub trait ChangedFilesSource: Send + Sync {
    async fn fetch(&self, repository: &Repository, pull_request: &PullRequest) -> anyhow::Result<Vec<ChangedFile>>;
}

/// Platform-specific comment operations (spec §4.10 stages 5, 8, 9, 11, 12).
/// A no-op/logging implementation is adequate for tests; real callers wire a
/// code-hosting adapter (GitHub/GitLab/etc) behind this trait.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    async fn minimize_previous_review_comment(&self, pull_request: &PullRequest) -> anyhow::Result<()>;
    async fn post_start_review_comment(&self, pull_request: &PullRequest) -> anyhow::Result<()>;
    async fn post_pr_level_comment(&self, pull_request: &PullRequest, comment: &Comment) -> anyhow::Result<()>;
    async fn post_line_comment(&self, pull_request: &PullRequest, comment: &Comment) -> anyhow::Result<()>;
    async fn auto_resolve_implemented_comment(&self, pull_request: &PullRequest, suggestion_id: &str) -> anyhow::Result<()>;
    async fn update_initial_comment(&self, pull_request: &PullRequest, summary: &str) -> anyhow::Result<()>;
    async fn request_changes(&self, pull_request: &PullRequest) -> anyhow::Result<()>;
    async fn approve(&self, pull_request: &PullRequest) -> anyhow::Result<()>;
    async fn post_pause_comment(&self, pull_request: &PullRequest) -> anyhow::Result<()>;
    /// Whether the PR already carries a `CHANGES_REQUESTED` review state
    /// (spec §4.10 stage 12: "never overwrite an existing CHANGES_REQUESTED
    /// state").
    async fn has_changes_requested(&self, pull_request: &PullRequest) -> anyhow::Result<bool>;
}

/// Clustering-based suppression of low-signal raw suggestions (Glossary
/// "Kody fine-tuning"); a no-op default keeps every suggestion.
pub trait KodyFineTuningFilter: Send + Sync {
    fn filter(&self, suggestions: Vec<Suggestion>) -> Vec<Suggestion>;
}

pub struct NoopKodyFilter;
impl KodyFineTuningFilter for NoopKodyFilter {
    fn filter(&self, suggestions: Vec<Suggestion>) -> Vec<Suggestion> {
        suggestions
    }
}

/// Secondary LLM verification pass (Glossary "Safeguard"); a no-op default
/// passes every suggestion through.
#[async_trait]
pub trait SafeguardVerifier: Send + Sync {
    async fn verify(&self, suggestions: Vec<Suggestion>) -> anyhow::Result<Vec<Suggestion>>;
}

pub struct NoopSafeguard;
#[async_trait]
impl SafeguardVerifier for NoopSafeguard {
    async fn verify(&self, suggestions: Vec<Suggestion>) -> anyhow::Result<Vec<Suggestion>> {
        Ok(suggestions)
    }
}

/// Cross-file suggestion aggregation (Glossary "Cross-file suggestion",
/// SPEC_FULL §F.5): a dedicated analyzer seam so the pipeline does not
/// hard-code a specific analysis. A default no-op implementation is
/// provided since the domain rule engine itself is out of scope.
#[async_trait]
pub trait CrossFileAnalyzer: Send + Sync {
    async fn analyze(&self, changed_files: &[ChangedFile]) -> anyhow::Result<Vec<Suggestion>>;
}

pub struct NoopCrossFileAnalyzer;
#[async_trait]
impl CrossFileAnalyzer for NoopCrossFileAnalyzer {
    async fn analyze(&self, _changed_files: &[ChangedFile]) -> anyhow::Result<Vec<Suggestion>> {
        Ok(Vec::new())
    }
}

/// PR-level, cross-file rule analysis (spec §4.10 stage 6). Separate from
/// `CrossFileAnalyzer` because PR-level review runs before files are batched
/// and produces comments rather than per-file suggestions.
#[async_trait]
pub trait PrLevelAnalyzer: Send + Sync {
    async fn analyze(&self, changed_files: &[ChangedFile]) -> anyhow::Result<Vec<Comment>>;
}

pub struct NoopPrLevelAnalyzer;
#[async_trait]
impl PrLevelAnalyzer for NoopPrLevelAnalyzer {
    async fn analyze(&self, _changed_files: &[ChangedFile]) -> anyhow::Result<Vec<Comment>> {
        Ok(Vec::new())
    }
}
