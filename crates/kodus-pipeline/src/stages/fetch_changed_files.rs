//! Stage 4: FetchChangedFiles — enumerate changed files, apply ignore globs
//! (left to the collaborator), enrich with per-hunk line numbers, compute
//! aggregate stats; cap at `max_files` (spec §4.10, §8 boundary behaviors).

use crate::collaborators::ChangedFilesSource;
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::stage::{Stage, StageResult};
use async_trait::async_trait;
use kodus_contracts::pipeline::{PipelineContext, SkipReason};
use std::sync::Arc;

pub struct FetchChangedFilesStage {
    source: Arc<dyn ChangedFilesSource>,
    config: PipelineConfig,
}

impl FetchChangedFilesStage {
    pub fn new(source: Arc<dyn ChangedFilesSource>, config: PipelineConfig) -> Self {
        Self { source, config }
    }
}

#[async_trait]
impl Stage for FetchChangedFilesStage {
    fn name(&self) -> &'static str {
        "FetchChangedFiles"
    }

    async fn run(&self, ctx: PipelineContext) -> StageResult {
        let files = match self.source.fetch(&ctx.repository, &ctx.pull_request).await {
            Ok(files) => files,
            Err(err) => {
                let failed = ctx.clone().skip(SkipReason::NoFilesInPr, err.to_string());
                return Err((PipelineError::ChangedFiles(err.to_string()), failed));
            }
        };

        if files.is_empty() {
            return Ok(ctx.skip(SkipReason::NoFilesAfterIgnore, None));
        }
        if files.len() > self.config.max_files {
            return Ok(ctx.skip(SkipReason::TooManyFiles, format!("{} files exceeds the cap of {}", files.len(), self.config.max_files)));
        }

        let batches = files
            .chunks(self.config.batch_size_max)
            .map(|chunk| chunk.to_vec())
            .collect();

        let mut next = ctx;
        next.changed_files = files;
        next.file_batches = batches;
        Ok(next)
    }
}
