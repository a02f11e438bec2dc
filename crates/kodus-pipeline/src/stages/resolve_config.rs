//! Stage 2: ResolveConfig — locate per-directory configs by inspecting
//! changed paths; fall back to repo-level, then global (spec §4.10).

use crate::collaborators::ConfigResolver;
use crate::error::PipelineError;
use crate::stage::{Stage, StageResult};
use async_trait::async_trait;
use kodus_contracts::pipeline::{PipelineContext, SkipReason};
use std::sync::Arc;

pub struct ResolveConfigStage {
    resolver: Arc<dyn ConfigResolver>,
}

impl ResolveConfigStage {
    pub fn new(resolver: Arc<dyn ConfigResolver>) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl Stage for ResolveConfigStage {
    fn name(&self) -> &'static str {
        "ResolveConfig"
    }

    async fn run(&self, ctx: PipelineContext) -> StageResult {
        let changed_paths: Vec<String> = ctx
            .file_metadata
            .get("_changed_paths")
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default();

        match self.resolver.resolve(&ctx.repository, &changed_paths).await {
            Ok(resolved) if resolved.is_empty() => Ok(ctx.skip(SkipReason::NoConfigInContext, None)),
            Ok(resolved) => {
                let mut next = ctx;
                next.resolved_config = resolved;
                Ok(next)
            }
            Err(err) => {
                let failed = ctx.clone().skip(SkipReason::FailedResolveConfig, err.to_string());
                Err((PipelineError::ConfigResolution(err.to_string()), failed))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use kodus_contracts::pipeline::{OrganizationAndTeamData, PullRequest, Repository};
    use serde_json::Value;
    use std::collections::HashMap;

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

    struct AlwaysResolves;
    #[async_trait]
    impl ConfigResolver for AlwaysResolves {
        async fn resolve(&self, _repo: &Repository, _paths: &[String]) -> anyhow::Result<HashMap<String, Value>> {
            Ok(HashMap::from([("src/".to_string(), serde_json::json!({"enabled": true}))]))
        }
    }

    struct NeverResolves;
    #[async_trait]
    impl ConfigResolver for NeverResolves {
        async fn resolve(&self, _repo: &Repository, _paths: &[String]) -> anyhow::Result<HashMap<String, Value>> {
            Ok(HashMap::new())
        }
    }

    #[tokio::test]
    async fn found_config_populates_context() {
        let stage = ResolveConfigStage::new(Arc::new(AlwaysResolves));
        let result = stage.run(ctx()).await.unwrap();
        assert!(!result.is_skipped());
        assert!(result.resolved_config.contains_key("src/"));
    }

    #[tokio::test]
    async fn missing_config_skips() {
        let stage = ResolveConfigStage::new(Arc::new(NeverResolves));
        let result = stage.run(ctx()).await.unwrap();
        assert!(result.is_skipped());
    }
}
