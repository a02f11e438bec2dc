//! Plan/Step model shared by ReWOO and Plan-Execute strategies (spec §3, §9).
//!
//! Steps reference each other by id, not by direct reference, per §9
//! "Cyclic references -> arenas + indices": a plan is an arena of `Step`s
//! keyed by `StepId`, and `dependsOn` is a list of ids into that arena.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type StepId = String;

/// Tagged action/step variant. Unknown variants fail to deserialize rather
/// than falling back to a default arm, per §9 "Dynamic dispatch -> tagged
/// variants ... an unknown variant is an error, not a default case."
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepKind {
    ToolCall { tool_name: String },
    FinalAnswer,
    NeedMoreInfo { question: String },
    Delegate { target_agent: String },
    ExecutePlan { plan_id: StepId },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub id: StepId,
    pub kind: StepKind,
    /// Raw (unresolved) input arguments; may contain `{{stepId.field}}`
    /// placeholders resolved by `resolveArgs` before execution.
    pub inputs: Value,
    pub depends_on: Vec<StepId>,
    pub pass_previous_result: bool,
    pub status: StepStatus,
    pub result: Option<Value>,
}

impl Step {
    pub fn new(id: impl Into<String>, kind: StepKind, inputs: Value) -> Self {
        Self {
            id: id.into(),
            kind,
            inputs,
            depends_on: Vec::new(),
            pass_previous_result: false,
            status: StepStatus::Pending,
            result: None,
        }
    }

    pub fn depends_on(mut self, ids: impl IntoIterator<Item = StepId>) -> Self {
        self.depends_on = ids.into_iter().collect();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Pending,
    Executing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub goal: String,
    pub strategy: String,
    pub steps: Vec<Step>,
    pub status: PlanStatus,
    /// Free-form planner signals (e.g. confidence, rationale) that do not
    /// affect execution but are useful for diagnostics/synthesis.
    pub signals: Value,
}

impl Plan {
    pub fn new(id: impl Into<String>, goal: impl Into<String>, strategy: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            goal: goal.into(),
            strategy: strategy.into(),
            steps: Vec::new(),
            status: PlanStatus::Pending,
            signals: Value::Null,
        }
    }

    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    pub fn step_mut(&mut self, id: &str) -> Option<&mut Step> {
        self.steps.iter_mut().find(|s| s.id == id)
    }
}
