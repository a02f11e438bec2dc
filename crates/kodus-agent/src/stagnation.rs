//! Stagnation detection for the ReAct loop (spec §4.7, SPEC_FULL §F.1),
//! grounded in `restflow-ai/src/agent/stuck.rs`'s window-based repeat
//! detector, adapted from tool-call fingerprints to the spec's action-type
//! + failure-streak rule.

use kodus_contracts::StepKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Succeeded,
    Failed,
}

#[derive(Debug, Clone)]
pub struct IterationRecord {
    pub action: StepKind,
    pub outcome: ActionOutcome,
}

/// Pluggable stagnation policy so callers can swap in a stricter or looser
/// rule without touching the ReAct loop itself.
pub trait StagnationPolicy: Send + Sync {
    fn is_stagnant(&self, history: &[IterationRecord]) -> bool;
}

fn action_kind_tag(action: &StepKind) -> &'static str {
    match action {
        StepKind::ToolCall { .. } => "tool_call",
        StepKind::FinalAnswer => "final_answer",
        StepKind::NeedMoreInfo { .. } => "need_more_info",
        StepKind::Delegate { .. } => "delegate",
        StepKind::ExecutePlan { .. } => "execute_plan",
    }
}

/// Default rule (spec §4.7): stagnant when the last three actions share the
/// same type without progress, or the last two outcomes both failed.
pub struct DefaultStagnationPolicy;

impl StagnationPolicy for DefaultStagnationPolicy {
    fn is_stagnant(&self, history: &[IterationRecord]) -> bool {
        if history.len() >= 2 {
            let last_two = &history[history.len() - 2..];
            if last_two.iter().all(|r| r.outcome == ActionOutcome::Failed) {
                return true;
            }
        }
        if history.len() >= 3 {
            let last_three = &history[history.len() - 3..];
            let first_tag = action_kind_tag(&last_three[0].action);
            if last_three.iter().all(|r| action_kind_tag(&r.action) == first_tag) {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool_call(name: &str) -> StepKind {
        StepKind::ToolCall {
            tool_name: name.to_string(),
        }
    }

    #[test]
    fn not_stagnant_with_short_history() {
        let policy = DefaultStagnationPolicy;
        let history = vec![IterationRecord {
            action: tool_call("search"),
            outcome: ActionOutcome::Succeeded,
        }];
        assert!(!policy.is_stagnant(&history));
    }

    #[test]
    fn stagnant_on_two_consecutive_failures() {
        let policy = DefaultStagnationPolicy;
        let history = vec![
            IterationRecord {
                action: tool_call("search"),
                outcome: ActionOutcome::Failed,
            },
            IterationRecord {
                action: tool_call("fetch"),
                outcome: ActionOutcome::Failed,
            },
        ];
        assert!(policy.is_stagnant(&history));
    }

    #[test]
    fn stagnant_on_repeated_action_type_in_last_three() {
        let policy = DefaultStagnationPolicy;
        let history = vec![
            IterationRecord {
                action: tool_call("search"),
                outcome: ActionOutcome::Succeeded,
            },
            IterationRecord {
                action: tool_call("fetch"),
                outcome: ActionOutcome::Succeeded,
            },
            IterationRecord {
                action: tool_call("list"),
                outcome: ActionOutcome::Succeeded,
            },
        ];
        assert!(policy.is_stagnant(&history));
    }

    #[test]
    fn not_stagnant_when_action_types_vary() {
        let policy = DefaultStagnationPolicy;
        let history = vec![
            IterationRecord {
                action: tool_call("search"),
                outcome: ActionOutcome::Succeeded,
            },
            IterationRecord {
                action: StepKind::NeedMoreInfo {
                    question: "which repo?".into(),
                },
                outcome: ActionOutcome::Succeeded,
            },
            IterationRecord {
                action: StepKind::FinalAnswer,
                outcome: ActionOutcome::Succeeded,
            },
        ];
        assert!(!policy.is_stagnant(&history));
    }
}
