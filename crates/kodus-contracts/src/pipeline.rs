//! Code-review pipeline context (spec §3 "Pipeline Context", §4.10, §6).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// The immutable triple every pipeline run carries end to end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationAndTeamData {
    pub organization_id: String,
    pub team_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub id: String,
    pub full_name: String,
    pub default_branch: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub base_branch: String,
    pub head_branch: String,
    pub head_sha: String,
    /// `synchronize`/`update` vs the initial `opened` event; drives the
    /// "re-run suppresses duplicate suggestions" rule in §4.10 step 8.
    pub is_update_event: bool,
}

/// A single hunk of changed lines within a file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hunk {
    pub start_line: u32,
    pub line_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangedFile {
    pub path: String,
    pub additions: u32,
    pub deletions: u32,
    pub hunks: Vec<Hunk>,
    pub patch: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: String,
    pub file_path: String,
    pub line: u32,
    pub category: String,
    pub severity: Severity,
    pub body: String,
    pub rank_score: Option<f64>,
    pub cross_file: bool,
}

impl Suggestion {
    pub fn new(file_path: impl Into<String>, line: u32, category: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            file_path: file_path.into(),
            line,
            category: category.into(),
            severity: Severity::Medium,
            body: body.into(),
            rank_score: None,
            cross_file: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub body: String,
    pub file_path: Option<String>,
    pub line: Option<u32>,
}

/// Reasons a pipeline run can skip to success-without-processing (spec §6).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkipReason {
    NoConfigInContext,
    NoFilesAfterIgnore,
    TooManyFiles,
    ConfigValidationError,
    FirstReviewRequired,
    ProcessingInProgress,
    ManualRequiredToStart,
    PrPausedNeedResume,
    PrPausedBurstPushes,
    FailedResolveConfig,
    NoFilesInPr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PipelineStatus {
    Running,
    Success,
    Skipped { reason: SkipReason, message: Option<String> },
    Error { cause: String },
}

impl PipelineStatus {
    pub fn is_terminal_skip(&self) -> bool {
        matches!(self, PipelineStatus::Skipped { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineMetadata {
    pub pipeline_id: String,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

/// The typed context threaded through every stage of the code-review
/// pipeline. Stages receive this by value and return a new version
/// (functional update, spec §3 "Ownership").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineContext {
    pub pipeline_metadata: PipelineMetadata,
    pub organization_and_team: OrganizationAndTeamData,
    pub repository: Repository,
    pub pull_request: PullRequest,

    pub status: PipelineStatus,

    /// Per-directory resolved configuration, keyed by directory path.
    pub resolved_config: HashMap<String, Value>,

    pub changed_files: Vec<ChangedFile>,
    pub file_batches: Vec<Vec<ChangedFile>>,

    pub valid_suggestions: Vec<Suggestion>,
    pub discarded_suggestions: Vec<Suggestion>,
    pub overall_comments: Vec<Comment>,
    pub pr_level_comments: Vec<Comment>,
    pub line_comments: Vec<Comment>,

    /// Free-form per-file analysis task descriptors, produced by
    /// `FetchChangedFiles` and consumed by `ProcessFilesReview`.
    pub analysis_tasks: Vec<Value>,
    pub file_metadata: HashMap<String, Value>,
}

impl PipelineContext {
    pub fn new(
        organization_and_team: OrganizationAndTeamData,
        repository: Repository,
        pull_request: PullRequest,
    ) -> Self {
        Self {
            pipeline_metadata: PipelineMetadata {
                pipeline_id: Uuid::new_v4().to_string(),
                started_at: chrono::Utc::now(),
            },
            organization_and_team,
            repository,
            pull_request,
            status: PipelineStatus::Running,
            resolved_config: HashMap::new(),
            changed_files: Vec::new(),
            file_batches: Vec::new(),
            valid_suggestions: Vec::new(),
            discarded_suggestions: Vec::new(),
            overall_comments: Vec::new(),
            pr_level_comments: Vec::new(),
            line_comments: Vec::new(),
            analysis_tasks: Vec::new(),
            file_metadata: HashMap::new(),
        }
    }

    pub fn skip(mut self, reason: SkipReason, message: impl Into<Option<String>>) -> Self {
        self.status = PipelineStatus::Skipped {
            reason,
            message: message.into(),
        };
        self
    }

    pub fn is_skipped(&self) -> bool {
        self.status.is_terminal_skip()
    }
}
