//! Tool result aggregation (spec §4.8 "Aggregation"): parallel/sequential/
//! conditional/adaptive execution modes feed into one of four merge
//! policies.

use serde_json::{Map, Value, json};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    Combine,
    Merge,
    Aggregate,
    Summarize,
}

#[derive(Debug, Clone)]
pub struct IndividualResult {
    pub tool_name: String,
    pub success: bool,
    pub output: Option<Value>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct AggregationSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub strategy: &'static str,
    pub error_summary: Option<String>,
}

pub struct AggregationOutcome {
    pub aggregated_result: Value,
    pub summary: AggregationSummary,
    pub individual_results: Vec<IndividualResult>,
}

fn strategy_name(policy: MergePolicy) -> &'static str {
    match policy {
        MergePolicy::Combine => "combine",
        MergePolicy::Merge => "merge",
        MergePolicy::Aggregate => "aggregate",
        MergePolicy::Summarize => "summarize",
    }
}

/// Heuristic classification of a tool's role from its name, used by the
/// `aggregate` policy to group per-tool transformations (spec §4.8).
fn role_heuristic(tool_name: &str) -> &'static str {
    let lower = tool_name.to_lowercase();
    if lower.contains("search") || lower.contains("fetch") || lower.contains("retriev") {
        "retrieval"
    } else if lower.contains("process") || lower.contains("transform") {
        "processing"
    } else if lower.contains("valid") || lower.contains("check") {
        "validation"
    } else if lower.contains("generat") || lower.contains("create") || lower.contains("write") {
        "generation"
    } else {
        "generic"
    }
}

pub fn aggregate(results: Vec<IndividualResult>, policy: MergePolicy) -> AggregationOutcome {
    let total = results.len();
    let successful = results.iter().filter(|r| r.success).count();
    let failed = total - successful;
    let error_summary = if failed > 0 {
        Some(
            results
                .iter()
                .filter_map(|r| r.error.as_ref().map(|e| format!("{}: {e}", r.tool_name)))
                .collect::<Vec<_>>()
                .join("; "),
        )
    } else {
        None
    };

    let aggregated_result = match policy {
        MergePolicy::Combine => {
            let mut slots = Map::new();
            for r in &results {
                slots.insert(
                    r.tool_name.clone(),
                    r.output.clone().unwrap_or_else(|| json!({"error": r.error})),
                );
            }
            Value::Object(slots)
        }
        MergePolicy::Merge => {
            let mut merged = Map::new();
            for r in &results {
                if let Some(Value::Object(obj)) = &r.output {
                    for (key, value) in obj {
                        merged.insert(key.clone(), value.clone());
                    }
                }
            }
            Value::Object(merged)
        }
        MergePolicy::Aggregate => {
            let mut by_role: Map<String, Value> = Map::new();
            for r in &results {
                let role = role_heuristic(&r.tool_name);
                let entry = by_role.entry(role.to_string()).or_insert_with(|| Value::Array(Vec::new()));
                if let Value::Array(arr) = entry {
                    arr.push(json!({
                        "tool": r.tool_name,
                        "success": r.success,
                        "output": r.output,
                    }));
                }
            }
            Value::Object(by_role)
        }
        MergePolicy::Summarize => {
            let narrative = format!(
                "{successful}/{total} tools succeeded{}",
                if failed > 0 {
                    format!(", {failed} failed: {}", error_summary.clone().unwrap_or_default())
                } else {
                    String::new()
                }
            );
            json!({ "narrative": narrative })
        }
    };

    AggregationOutcome {
        aggregated_result,
        summary: AggregationSummary {
            total,
            successful,
            failed,
            strategy: strategy_name(policy),
            error_summary,
        },
        individual_results: results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(tool_name: &str, output: Value) -> IndividualResult {
        IndividualResult {
            tool_name: tool_name.to_string(),
            success: true,
            output: Some(output),
            error: None,
        }
    }

    fn err(tool_name: &str, error: &str) -> IndividualResult {
        IndividualResult {
            tool_name: tool_name.to_string(),
            success: false,
            output: None,
            error: Some(error.to_string()),
        }
    }

    #[test]
    fn combine_preserves_per_tool_slots() {
        let outcome = aggregate(vec![ok("search", json!({"hits": 3}))], MergePolicy::Combine);
        assert_eq!(outcome.aggregated_result, json!({"search": {"hits": 3}}));
    }

    #[test]
    fn merge_unions_object_results_with_later_winning() {
        let outcome = aggregate(
            vec![ok("a", json!({"x": 1})), ok("b", json!({"x": 2, "y": 3}))],
            MergePolicy::Merge,
        );
        assert_eq!(outcome.aggregated_result, json!({"x": 2, "y": 3}));
    }

    #[test]
    fn aggregate_groups_by_name_heuristic() {
        let outcome = aggregate(vec![ok("search_docs", json!({})), ok("validate_input", json!({}))], MergePolicy::Aggregate);
        let obj = outcome.aggregated_result.as_object().unwrap();
        assert!(obj.contains_key("retrieval"));
        assert!(obj.contains_key("validation"));
    }

    #[test]
    fn summarize_counts_failures() {
        let outcome = aggregate(vec![ok("a", json!({})), err("b", "timeout")], MergePolicy::Summarize);
        assert_eq!(outcome.summary.total, 2);
        assert_eq!(outcome.summary.successful, 1);
        assert_eq!(outcome.summary.failed, 1);
    }
}
