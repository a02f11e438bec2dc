use anyhow::Result;
use kodus_agent::mock_llm::MockLlmAdapter;
use kodus_agent::{AgentCore, AgentDefinition, InvocationOptions, ToolRegistry};
use kodus_contracts::context::{AgentIdentity, ExecutionLimits, StrategySelector};
use kodus_contracts::Quotas;
use kodus_kernel::{ExecutionKernel, KernelConfig, QueueConfig, Runtime};
use kodus_pipeline::collaborators::{
    ChangedFilesSource, ConfigResolver, NoopCrossFileAnalyzer, NoopKodyFilter, NoopPrLevelAnalyzer, NoopSafeguard, PlatformClient,
};
use kodus_pipeline::filters::InMemoryPreviousSuggestionsStore;
use kodus_pipeline::stages::{FileAnalyzer, InMemoryLastAnalyzedCommitStore};
use kodus_pipeline::{build_code_review_pipeline, CadenceMode, CodeReviewCollaborators, CodeReviewVersion, InMemoryCadenceStore, PipelineConfig};
use kodus_storage::{InMemoryPersistor, InMemorySessionStore};
use async_trait::async_trait;
use kodus_contracts::pipeline::{ChangedFile, Comment, Hunk, OrganizationAndTeamData, PipelineContext, PullRequest, Repository, Suggestion};
use std::collections::HashMap;
use std::sync::Arc;

pub async fn run_kernel() -> Result<()> {
    let runtime = Runtime::new(QueueConfig::default());
    let snapshots = InMemoryPersistor::new();
    let kernel = ExecutionKernel::new("demo-kernel", "tenant-demo", "job-demo", Quotas::default(), runtime, snapshots, KernelConfig::default());

    kernel.initialize("op-init").await?;
    println!("kernel {} initialized, status={:?}", kernel.id, kernel.status().await);

    let event_id = kernel
        .emit_async(
            "op-emit",
            "demo.ping",
            serde_json::json!({"hello": "world"}),
        )
        .await?;
    println!("emitted event {event_id}");

    let processed = kernel.process_events("op-process").await?;
    println!("processed {processed} event(s)");

    kernel.pause("op-pause", "demo complete").await?;
    println!("kernel paused, status={:?}", kernel.status().await);
    Ok(())
}

pub async fn run_agent(prompt: String, answer: String) -> Result<()> {
    let llm = Arc::new(MockLlmAdapter::with_responses(vec![kodus_traits::llm::LlmResponse {
        content: answer,
        tool_calls: vec![],
    }]));
    let sessions = InMemorySessionStore::new();
    let core = AgentCore::new(llm, sessions, "tenant-demo");

    let definition = AgentDefinition {
        identity: AgentIdentity {
            name: "demo-agent".into(),
            description: Some("exercises the strategy runtime with a scripted response".into()),
        },
        strategy: StrategySelector::ReAct,
        system_prompt: None,
        limits: ExecutionLimits::default(),
        tools: Arc::new(ToolRegistry::new()),
    };

    let result = core
        .call_agent(
            &definition,
            serde_json::json!(prompt),
            InvocationOptions {
                thread_id: Some("demo-thread".into()),
                session_id: None,
            },
        )
        .await;

    println!("success={} output={:?} error={:?}", result.success, result.output, result.error);
    Ok(())
}

struct DemoConfigResolver;
#[async_trait]
impl ConfigResolver for DemoConfigResolver {
    async fn resolve(&self, _repository: &Repository, _changed_paths: &[String]) -> anyhow::Result<HashMap<String, serde_json::Value>> {
        Ok(HashMap::from([("".to_string(), serde_json::json!({"enabled": true}))]))
    }
}

struct DemoChangedFiles;
#[async_trait]
impl ChangedFilesSource for DemoChangedFiles {
    async fn fetch(&self, _repository: &Repository, _pull_request: &PullRequest) -> anyhow::Result<Vec<ChangedFile>> {
        Ok(vec![ChangedFile {
            path: "src/lib.rs".into(),
            additions: 12,
            deletions: 3,
            hunks: vec![Hunk { start_line: 1, line_count: 30 }],
            patch: String::new(),
        }])
    }
}

struct DemoFileAnalyzer;
#[async_trait]
impl FileAnalyzer for DemoFileAnalyzer {
    async fn analyze(&self, file: &ChangedFile, _resolved_config: &serde_json::Value) -> anyhow::Result<Vec<Suggestion>> {
        Ok(vec![Suggestion::new(&file.path, 5, "style", "consider extracting this block into a helper")])
    }
}

struct LoggingPlatform;
#[async_trait]
impl PlatformClient for LoggingPlatform {
    async fn minimize_previous_review_comment(&self, _pull_request: &PullRequest) -> anyhow::Result<()> {
        Ok(())
    }
    async fn post_start_review_comment(&self, _pull_request: &PullRequest) -> anyhow::Result<()> {
        println!("-> posted start-review comment");
        Ok(())
    }
    async fn post_pr_level_comment(&self, _pull_request: &PullRequest, comment: &Comment) -> anyhow::Result<()> {
        println!("-> pr-level comment: {}", comment.body);
        Ok(())
    }
    async fn post_line_comment(&self, _pull_request: &PullRequest, comment: &Comment) -> anyhow::Result<()> {
        println!("-> line comment on {:?}:{:?}: {}", comment.file_path, comment.line, comment.body);
        Ok(())
    }
    async fn auto_resolve_implemented_comment(&self, _pull_request: &PullRequest, suggestion_id: &str) -> anyhow::Result<()> {
        println!("-> auto-resolved {suggestion_id}");
        Ok(())
    }
    async fn update_initial_comment(&self, _pull_request: &PullRequest, summary: &str) -> anyhow::Result<()> {
        println!("-> updated summary comment: {summary}");
        Ok(())
    }
    async fn request_changes(&self, _pull_request: &PullRequest) -> anyhow::Result<()> {
        println!("-> requested changes");
        Ok(())
    }
    async fn approve(&self, _pull_request: &PullRequest) -> anyhow::Result<()> {
        println!("-> approved");
        Ok(())
    }
    async fn post_pause_comment(&self, _pull_request: &PullRequest) -> anyhow::Result<()> {
        println!("-> posted cadence-pause comment");
        Ok(())
    }
    async fn has_changes_requested(&self, _pull_request: &PullRequest) -> anyhow::Result<bool> {
        Ok(false)
    }
}

pub async fn run_review() -> Result<()> {
    let collaborators = CodeReviewCollaborators {
        last_analyzed_commits: InMemoryLastAnalyzedCommitStore::new(),
        config_resolver: Arc::new(DemoConfigResolver),
        cadence_store: InMemoryCadenceStore::new(),
        cadence_mode: CadenceMode::Automatic,
        changed_files_source: Arc::new(DemoChangedFiles),
        platform: Arc::new(LoggingPlatform),
        post_start_review_comment: true,
        pr_level_analyzer: Arc::new(NoopPrLevelAnalyzer),
        file_analyzer: Arc::new(DemoFileAnalyzer),
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
    let ctx = PipelineContext::new(
        OrganizationAndTeamData {
            organization_id: "org-demo".into(),
            team_id: "team-demo".into(),
        },
        Repository {
            id: "repo-demo".into(),
            full_name: "acme/widgets".into(),
            default_branch: "main".into(),
        },
        PullRequest {
            number: 7,
            title: "refactor widget loader".into(),
            base_branch: "main".into(),
            head_branch: "feature/widget-loader".into(),
            head_sha: "abc123".into(),
            is_update_event: false,
        },
    );

    let result = executor.run(ctx).await;
    println!(
        "pipeline finished: status={:?} suggestions={} line_comments={}",
        result.status,
        result.valid_suggestions.len(),
        result.line_comments.len()
    );
    Ok(())
}
