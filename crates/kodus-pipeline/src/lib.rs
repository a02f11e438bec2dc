//! Pipeline Executor and Stages (C10): an ordered stage runner producing a
//! typed context, with batched, bounded-concurrency file analysis,
//! multi-filter suggestion refinement, and chunk-level retry for LLM calls.
//! Analogous to the teacher's `restflow-core::engine` module, specialized to
//! the fixed twelve-stage code-review pipeline (spec §4.10).

pub mod cadence;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod filters;
pub mod stage;
pub mod stages;

pub use cadence::{CadenceMode, CadenceStatus, CadenceStore, InMemoryCadenceStore, ReviewOrigin};
pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult};
pub use filters::CodeReviewVersion;
pub use stage::{PipelineExecutor, Stage, StageResult};

use stages::*;
use std::sync::Arc;

/// Everything the fixed twelve-stage code-review pipeline needs from its
/// caller (spec §1: "Out of scope ... referenced only via their contracts").
/// `build_code_review_pipeline` wires them into the stage order mandated by
/// spec §4.10; callers still run `PipelineExecutor::run` themselves, which
/// is where the actual stage-by-stage execution lives.
pub struct CodeReviewCollaborators {
    pub last_analyzed_commits: Arc<dyn LastAnalyzedCommitStore>,
    pub config_resolver: Arc<dyn collaborators::ConfigResolver>,
    pub cadence_store: Arc<dyn CadenceStore>,
    pub cadence_mode: CadenceMode,
    pub changed_files_source: Arc<dyn collaborators::ChangedFilesSource>,
    pub platform: Arc<dyn collaborators::PlatformClient>,
    pub post_start_review_comment: bool,
    pub pr_level_analyzer: Arc<dyn collaborators::PrLevelAnalyzer>,
    pub file_analyzer: Arc<dyn FileAnalyzer>,
    pub kody_filter: Arc<dyn collaborators::KodyFineTuningFilter>,
    pub safeguard: Arc<dyn collaborators::SafeguardVerifier>,
    pub cross_file_analyzer: Arc<dyn collaborators::CrossFileAnalyzer>,
    pub previous_suggestions: Arc<dyn filters::PreviousSuggestionsStore>,
    pub code_review_version: CodeReviewVersion,
    pub allowed_categories: Vec<String>,
    pub update_summary_enabled: bool,
    pub approve_when_clean: bool,
}

/// Assembles the fixed stage order of spec §4.10 into a [`PipelineExecutor`].
pub fn build_code_review_pipeline(collaborators: CodeReviewCollaborators, config: PipelineConfig) -> PipelineExecutor {
    let stages: Vec<Box<dyn Stage>> = vec![
        Box::new(ValidateNewCommitsStage::new(collaborators.last_analyzed_commits)),
        Box::new(ResolveConfigStage::new(collaborators.config_resolver)),
        Box::new(ValidateConfigStage::new(collaborators.cadence_store, collaborators.platform.clone(), config.clone(), collaborators.cadence_mode)),
        Box::new(FetchChangedFilesStage::new(collaborators.changed_files_source, config.clone())),
        Box::new(InitialCommentStage::new(collaborators.platform.clone(), collaborators.post_start_review_comment)),
        Box::new(ProcessFilesPrLevelReviewStage::new(collaborators.pr_level_analyzer)),
        Box::new(ProcessFilesReviewStage::new(
            collaborators.file_analyzer,
            collaborators.kody_filter,
            collaborators.safeguard,
            collaborators.cross_file_analyzer,
            collaborators.previous_suggestions.clone(),
            config,
            collaborators.code_review_version,
            collaborators.allowed_categories,
        )),
        Box::new(CreatePrLevelCommentsStage::new(collaborators.platform.clone())),
        Box::new(CreateFileCommentsStage::new(collaborators.platform.clone(), collaborators.previous_suggestions)),
        Box::new(AggregateResultsStage),
        Box::new(UpdateCommentsAndGenerateSummaryStage::new(collaborators.platform.clone(), collaborators.update_summary_enabled)),
        Box::new(RequestChangesOrApproveStage::new(collaborators.platform, collaborators.approve_when_clean)),
    ];
    PipelineExecutor::new(stages)
}
