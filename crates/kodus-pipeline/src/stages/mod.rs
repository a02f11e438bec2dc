//! The twelve code-review stages (spec §4.10), in the fixed order the
//! executor must run them.

pub mod aggregate_results;
pub mod create_file_comments;
pub mod create_pr_level_comments;
pub mod fetch_changed_files;
pub mod initial_comment;
pub mod process_files_pr_level;
pub mod process_files_review;
pub mod request_changes_or_approve;
pub mod resolve_config;
pub mod update_comments_and_summary;
pub mod validate_config;
pub mod validate_new_commits;

pub use aggregate_results::AggregateResultsStage;
pub use create_file_comments::CreateFileCommentsStage;
pub use create_pr_level_comments::CreatePrLevelCommentsStage;
pub use fetch_changed_files::FetchChangedFilesStage;
pub use initial_comment::InitialCommentStage;
pub use process_files_pr_level::ProcessFilesPrLevelReviewStage;
pub use process_files_review::{FileAnalyzer, ProcessFilesReviewStage};
pub use request_changes_or_approve::RequestChangesOrApproveStage;
pub use resolve_config::ResolveConfigStage;
pub use update_comments_and_summary::UpdateCommentsAndGenerateSummaryStage;
pub use validate_config::ValidateConfigStage;
pub use validate_new_commits::{InMemoryLastAnalyzedCommitStore, LastAnalyzedCommitStore, ValidateNewCommitsStage};
