//! Error kinds for the pipeline crate (spec §7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("config resolution failed: {0}")]
    ConfigResolution(String),
    #[error("failed to enumerate changed files: {0}")]
    ChangedFiles(String),
    #[error("platform call failed: {0}")]
    Platform(String),
    #[error("llm chunk exhausted retries: {0}")]
    LlmChunkFailed(String),
    #[error("cadence store error: {0}")]
    Cadence(String),
    #[error("internal error: {0}")]
    Internal(String),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
