//! Suggestion filtering pipeline (spec §4.10 "Suggestion filtering
//! pipeline", run once per file inside `ProcessFilesReview`).
//!
//! Each step is a small, independently testable function or trait hook; the
//! stage composes them in the fixed order the spec prescribes.

use crate::collaborators::{KodyFineTuningFilter, SafeguardVerifier};
use async_trait::async_trait;
use dashmap::DashMap;
use kodus_contracts::pipeline::{ChangedFile, Severity, Suggestion};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeReviewVersion {
    V1,
    V2,
}

/// Step 2: category allow-list from `reviewOptions`. An empty allow-list
/// means "no restriction" — every category passes.
pub fn filter_by_review_options(suggestions: Vec<Suggestion>, allowed_categories: &[String]) -> Vec<Suggestion> {
    if allowed_categories.is_empty() {
        return suggestions;
    }
    suggestions
        .into_iter()
        .filter(|s| allowed_categories.iter().any(|c| c.eq_ignore_ascii_case(&s.category)))
        .collect()
}

/// Step 3: drop suggestions targeting lines outside the file's changed
/// hunks (spec: "code-diff intersection").
pub fn filter_by_diff_intersection(suggestions: Vec<Suggestion>, file: &ChangedFile) -> Vec<Suggestion> {
    suggestions
        .into_iter()
        .filter(|s| {
            file.hunks
                .iter()
                .any(|h| s.line >= h.start_line && s.line < h.start_line + h.line_count)
        })
        .collect()
}

/// Step 4: clustering-based suppression (Kody fine-tuning).
pub fn apply_kody_fine_tuning(filter: &dyn KodyFineTuningFilter, suggestions: Vec<Suggestion>) -> Vec<Suggestion> {
    filter.filter(suggestions)
}

/// Step 5: severity prioritization, applied only under `codeReviewVersion =
/// v2` (spec). Highest severity first; ties keep their relative order
/// (stable sort).
pub fn prioritize_by_severity(mut suggestions: Vec<Suggestion>, version: CodeReviewVersion) -> Vec<Suggestion> {
    if version != CodeReviewVersion::V2 {
        return suggestions;
    }
    suggestions.sort_by_key(|s| severity_rank(s.severity));
    suggestions
}

fn severity_rank(severity: Severity) -> u8 {
    match severity {
        Severity::Critical => 0,
        Severity::High => 1,
        Severity::Medium => 2,
        Severity::Low => 3,
    }
}

/// Step 6: secondary LLM verification.
pub async fn apply_safeguard(verifier: &dyn SafeguardVerifier, suggestions: Vec<Suggestion>) -> anyhow::Result<Vec<Suggestion>> {
    verifier.verify(suggestions).await
}

/// Step 7: merge in Kody-rule-engine and AST-derived suggestions plus
/// cross-file suggestions scoped to this file, tagging the latter.
pub fn merge_additional_suggestions(
    mut base: Vec<Suggestion>,
    kody_rules: Vec<Suggestion>,
    ast_suggestions: Vec<Suggestion>,
    cross_file_for_this_file: Vec<Suggestion>,
) -> Vec<Suggestion> {
    base.extend(kody_rules);
    base.extend(ast_suggestions);
    base.extend(cross_file_for_this_file.into_iter().map(|mut s| {
        s.cross_file = true;
        s
    }));
    base
}

/// Step 8: tracks suggestions sent on a prior run of the same PR that were
/// not yet implemented, so a re-run (synchronize/update event) can suppress
/// duplicates and validate whether they've since been addressed.
#[async_trait]
pub trait PreviousSuggestionsStore: Send + Sync {
    async fn not_yet_implemented(&self, pull_request_number: u64, file_path: &str) -> Vec<Suggestion>;
}

#[derive(Default)]
pub struct InMemoryPreviousSuggestionsStore {
    by_pr_and_file: DashMap<(u64, String), Vec<Suggestion>>,
}

impl InMemoryPreviousSuggestionsStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed(&self, pull_request_number: u64, file_path: impl Into<String>, suggestions: Vec<Suggestion>) {
        self.by_pr_and_file.insert((pull_request_number, file_path.into()), suggestions);
    }
}

#[async_trait]
impl PreviousSuggestionsStore for InMemoryPreviousSuggestionsStore {
    async fn not_yet_implemented(&self, pull_request_number: u64, file_path: &str) -> Vec<Suggestion> {
        self.by_pr_and_file
            .get(&(pull_request_number, file_path.to_string()))
            .map(|e| e.value().clone())
            .unwrap_or_default()
    }
}

/// A previously sent suggestion is considered implemented if the diff no
/// longer contains a hunk touching its line; that check is left to the
/// caller (it requires the file's current hunks), this function only
/// performs the dedup half of step 8.
pub fn suppress_duplicates_of_unimplemented(suggestions: Vec<Suggestion>, previously_sent: &[Suggestion]) -> Vec<Suggestion> {
    suggestions
        .into_iter()
        .filter(|s| {
            !previously_sent
                .iter()
                .any(|p| p.file_path == s.file_path && p.line == s.line && p.category == s.category)
        })
        .collect()
}

/// Returns the subset of `previously_sent` whose target line is no longer
/// present in any of the file's current hunks — i.e. implemented.
pub fn implemented_suggestions<'a>(previously_sent: &'a [Suggestion], file: &ChangedFile) -> Vec<&'a Suggestion> {
    previously_sent
        .iter()
        .filter(|p| !file.hunks.iter().any(|h| p.line >= h.start_line && p.line < h.start_line + h.line_count))
        .collect()
}

/// Step 9: rank score. A simple, documented heuristic: severity weight
/// dominates, cross-file suggestions get a small boost (they represent
/// broader-impact findings).
pub fn compute_rank_scores(mut suggestions: Vec<Suggestion>) -> Vec<Suggestion> {
    for s in &mut suggestions {
        let severity_weight = match s.severity {
            Severity::Critical => 100.0,
            Severity::High => 75.0,
            Severity::Medium => 50.0,
            Severity::Low => 25.0,
        };
        let cross_file_bonus = if s.cross_file { 5.0 } else { 0.0 };
        s.rank_score = Some(severity_weight + cross_file_bonus);
    }
    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;
    use kodus_contracts::pipeline::Hunk;

    fn suggestion(line: u32, category: &str) -> Suggestion {
        Suggestion::new("src/lib.rs", line, category, "body")
    }

    #[test]
    fn category_allow_list_filters_out_non_matching() {
        let suggestions = vec![suggestion(1, "security"), suggestion(2, "style")];
        let result = filter_by_review_options(suggestions, &["security".to_string()]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].category, "security");
    }

    #[test]
    fn empty_allow_list_passes_everything() {
        let suggestions = vec![suggestion(1, "security"), suggestion(2, "style")];
        let result = filter_by_review_options(suggestions, &[]);
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn diff_intersection_drops_suggestions_on_unchanged_lines() {
        let file = ChangedFile {
            path: "src/lib.rs".into(),
            additions: 1,
            deletions: 0,
            hunks: vec![Hunk { start_line: 10, line_count: 5 }],
            patch: String::new(),
        };
        let suggestions = vec![suggestion(12, "bug"), suggestion(100, "bug")];
        let result = filter_by_diff_intersection(suggestions, &file);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].line, 12);
    }

    #[test]
    fn severity_prioritization_only_applies_under_v2() {
        let suggestions = vec![
            {
                let mut s = suggestion(1, "bug");
                s.severity = Severity::Low;
                s
            },
            {
                let mut s = suggestion(2, "bug");
                s.severity = Severity::Critical;
                s
            },
        ];
        let v1 = prioritize_by_severity(suggestions.clone(), CodeReviewVersion::V1);
        assert_eq!(v1[0].severity, Severity::Low);

        let v2 = prioritize_by_severity(suggestions, CodeReviewVersion::V2);
        assert_eq!(v2[0].severity, Severity::Critical);
    }

    #[test]
    fn rank_score_weights_severity_and_cross_file() {
        let mut s = suggestion(1, "bug");
        s.severity = Severity::Critical;
        s.cross_file = true;
        let scored = compute_rank_scores(vec![s]);
        assert_eq!(scored[0].rank_score, Some(105.0));
    }

    #[tokio::test]
    async fn previous_suggestions_store_returns_seeded_suggestions() {
        let store = InMemoryPreviousSuggestionsStore::new();
        store.seed(42, "src/lib.rs", vec![suggestion(1, "bug")]);
        let found = store.not_yet_implemented(42, "src/lib.rs").await;
        assert_eq!(found.len(), 1);
        let missing = store.not_yet_implemented(42, "other.rs").await;
        assert!(missing.is_empty());
    }

    #[test]
    fn implemented_suggestions_are_those_outside_current_hunks() {
        let file = ChangedFile {
            path: "src/lib.rs".into(),
            additions: 1,
            deletions: 0,
            hunks: vec![Hunk { start_line: 10, line_count: 5 }],
            patch: String::new(),
        };
        let previously_sent = vec![suggestion(3, "bug"), suggestion(12, "bug")];
        let implemented = implemented_suggestions(&previously_sent, &file);
        assert_eq!(implemented.len(), 1);
        assert_eq!(implemented[0].line, 3);
    }
}
