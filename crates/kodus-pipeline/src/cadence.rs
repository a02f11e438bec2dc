//! Review cadence state machine (spec §4.10 "Review cadence", inside
//! `ValidateConfig`). Grounded on the general persisted-state-machine shape
//! of a status enum read back across runs (`restflow-core`'s auth manager),
//! adapted to the cadence rules.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use kodus_contracts::pipeline::SkipReason;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CadenceMode {
    Automatic,
    Manual,
    AutoPause,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CadenceStatus {
    Automatic,
    Paused,
    Command,
}

/// Origin of the event that triggered this pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewOrigin {
    Command,
    Push,
}

/// Persisted cadence state per repository (spec: "persisted
/// `currentStatus`"). Out of scope per §1 (a storage adapter); callers
/// inject a real implementation, `InMemoryCadenceStore` suffices for tests.
#[async_trait]
pub trait CadenceStore: Send + Sync {
    async fn current_status(&self, repository_id: &str) -> CadenceStatus;
    async fn set_status(&self, repository_id: &str, status: CadenceStatus);
    async fn has_prior_successful_review(&self, repository_id: &str) -> bool;
    /// Count of successful reviews completed within `since..=now`.
    async fn successful_reviews_since(&self, repository_id: &str, since: DateTime<Utc>) -> usize;
    async fn record_successful_review(&self, repository_id: &str, at: DateTime<Utc>);
}

#[derive(Debug, Default)]
struct RepoCadenceState {
    status: CadenceStatus,
    has_prior_review: bool,
    review_timestamps: Vec<DateTime<Utc>>,
}

impl Default for CadenceStatus {
    fn default() -> Self {
        CadenceStatus::Automatic
    }
}

/// In-memory cadence store; real deployments back this with the same store
/// used for `SessionStore`/`SnapshotStore` (spec §6 persisted state layout).
#[derive(Default)]
pub struct InMemoryCadenceStore {
    repos: DashMap<String, RepoCadenceState>,
}

impl InMemoryCadenceStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl CadenceStore for InMemoryCadenceStore {
    async fn current_status(&self, repository_id: &str) -> CadenceStatus {
        self.repos.get(repository_id).map(|e| e.status).unwrap_or(CadenceStatus::Automatic)
    }

    async fn set_status(&self, repository_id: &str, status: CadenceStatus) {
        self.repos.entry(repository_id.to_string()).or_default().status = status;
    }

    async fn has_prior_successful_review(&self, repository_id: &str) -> bool {
        self.repos.get(repository_id).map(|e| e.has_prior_review).unwrap_or(false)
    }

    async fn successful_reviews_since(&self, repository_id: &str, since: DateTime<Utc>) -> usize {
        self.repos
            .get(repository_id)
            .map(|e| e.review_timestamps.iter().filter(|ts| **ts >= since).count())
            .unwrap_or(0)
    }

    async fn record_successful_review(&self, repository_id: &str, at: DateTime<Utc>) {
        let mut entry = self.repos.entry(repository_id.to_string()).or_default();
        entry.has_prior_review = true;
        entry.review_timestamps.push(at);
    }
}

/// Decision returned by [`decide`]: whether `ValidateConfig` should let the
/// pipeline proceed, and the cadence status that must be persisted either way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CadenceDecision {
    pub should_process: bool,
    pub new_status: CadenceStatus,
    pub skip_reason: Option<SkipReason>,
}

/// Pure decision function for the cadence rules in spec §4.10. Takes the
/// already-fetched burst count (`reviews_in_window`) so this stays free of
/// store access and is trivially unit-testable.
pub fn decide(
    origin: ReviewOrigin,
    mode: CadenceMode,
    current_status: CadenceStatus,
    has_prior_successful_review: bool,
    reviews_in_window: usize,
    pushes_to_trigger: usize,
) -> CadenceDecision {
    if origin == ReviewOrigin::Command {
        return CadenceDecision {
            should_process: true,
            new_status: CadenceStatus::Command,
            skip_reason: None,
        };
    }

    match mode {
        CadenceMode::Automatic => CadenceDecision {
            should_process: true,
            new_status: CadenceStatus::Automatic,
            skip_reason: None,
        },
        CadenceMode::Manual => {
            if !has_prior_successful_review {
                CadenceDecision {
                    should_process: true,
                    new_status: CadenceStatus::Automatic,
                    skip_reason: None,
                }
            } else {
                CadenceDecision {
                    should_process: false,
                    new_status: CadenceStatus::Paused,
                    skip_reason: Some(SkipReason::ManualRequiredToStart),
                }
            }
        }
        CadenceMode::AutoPause => {
            if !has_prior_successful_review {
                return CadenceDecision {
                    should_process: true,
                    new_status: CadenceStatus::Automatic,
                    skip_reason: None,
                };
            }
            if current_status == CadenceStatus::Paused {
                return CadenceDecision {
                    should_process: false,
                    new_status: CadenceStatus::Paused,
                    skip_reason: Some(SkipReason::PrPausedNeedResume),
                };
            }
            if reviews_in_window >= pushes_to_trigger {
                CadenceDecision {
                    should_process: false,
                    new_status: CadenceStatus::Paused,
                    skip_reason: Some(SkipReason::PrPausedBurstPushes),
                }
            } else {
                CadenceDecision {
                    should_process: true,
                    new_status: CadenceStatus::Automatic,
                    skip_reason: None,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_origin_always_processes() {
        let decision = decide(ReviewOrigin::Command, CadenceMode::Manual, CadenceStatus::Paused, true, 10, 1);
        assert!(decision.should_process);
        assert_eq!(decision.new_status, CadenceStatus::Command);
    }

    #[test]
    fn manual_skips_after_first_successful_review() {
        let decision = decide(ReviewOrigin::Push, CadenceMode::Manual, CadenceStatus::Automatic, true, 0, 10);
        assert!(!decision.should_process);
        assert_eq!(decision.new_status, CadenceStatus::Paused);
        assert_eq!(decision.skip_reason, Some(SkipReason::ManualRequiredToStart));
    }

    #[test]
    fn manual_processes_first_review() {
        let decision = decide(ReviewOrigin::Push, CadenceMode::Manual, CadenceStatus::Automatic, false, 0, 10);
        assert!(decision.should_process);
    }

    #[test]
    fn auto_pause_burst_rule_pauses_at_threshold() {
        let decision = decide(ReviewOrigin::Push, CadenceMode::AutoPause, CadenceStatus::Automatic, true, 3, 3);
        assert!(!decision.should_process);
        assert_eq!(decision.skip_reason, Some(SkipReason::PrPausedBurstPushes));
    }

    #[test]
    fn auto_pause_stays_under_threshold() {
        let decision = decide(ReviewOrigin::Push, CadenceMode::AutoPause, CadenceStatus::Automatic, true, 2, 3);
        assert!(decision.should_process);
    }

    #[test]
    fn auto_pause_already_paused_skips_without_recount() {
        let decision = decide(ReviewOrigin::Push, CadenceMode::AutoPause, CadenceStatus::Paused, true, 0, 3);
        assert!(!decision.should_process);
        assert_eq!(decision.skip_reason, Some(SkipReason::PrPausedNeedResume));
    }
}
