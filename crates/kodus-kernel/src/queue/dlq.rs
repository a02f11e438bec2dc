//! Dead-letter queue (spec §4.3 "DLQ").

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use kodus_contracts::Event;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct DlqEntry {
    pub event: Event,
    pub first_failure_ts: DateTime<Utc>,
    pub attempts: u32,
    pub last_error: String,
}

/// Criteria for `reprocess` (spec §4.3).
#[derive(Debug, Clone, Default)]
pub struct ReprocessCriteria {
    pub max_age_secs: Option<i64>,
    pub limit: Option<usize>,
    pub event_type: Option<String>,
}

#[derive(Default)]
pub struct DeadLetterQueue {
    entries: DashMap<String, DlqEntry>,
}

impl DeadLetterQueue {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, event: Event, error: String) {
        self.entries
            .entry(event.id.clone())
            .and_modify(|e| {
                e.attempts += 1;
                e.last_error = error.clone();
            })
            .or_insert_with(|| DlqEntry {
                event: event.clone(),
                first_failure_ts: Utc::now(),
                attempts: 1,
                last_error: error,
            });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Selects entries matching `criteria` for reprocessing. Does not remove
    /// them; the caller removes via `remove` once reprocessing succeeds.
    pub fn select(&self, criteria: &ReprocessCriteria) -> Vec<DlqEntry> {
        let now = Utc::now();
        let mut matches: Vec<DlqEntry> = self
            .entries
            .iter()
            .filter(|entry| {
                if let Some(ref event_type) = criteria.event_type {
                    if &entry.event.event_type != event_type {
                        return false;
                    }
                }
                if let Some(max_age) = criteria.max_age_secs {
                    let age = (now - entry.first_failure_ts).num_seconds();
                    if age > max_age {
                        return false;
                    }
                }
                true
            })
            .map(|entry| entry.value().clone())
            .collect();

        matches.sort_by_key(|e| e.first_failure_ts);
        if let Some(limit) = criteria.limit {
            matches.truncate(limit);
        }
        matches
    }

    pub fn remove(&self, event_id: &str) {
        self.entries.remove(event_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event() -> Event {
        Event::new("agent.error", json!({}))
    }

    #[test]
    fn tracks_attempts_across_pushes() {
        let dlq = DeadLetterQueue::new();
        let e = event();
        dlq.push(e.clone(), "first".into());
        dlq.push(e.clone(), "second".into());
        let selected = dlq.select(&ReprocessCriteria::default());
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].attempts, 2);
        assert_eq!(selected[0].last_error, "second");
    }

    #[test]
    fn select_filters_by_event_type() {
        let dlq = DeadLetterQueue::new();
        dlq.push(Event::new("agent.error", json!({})), "e1".into());
        dlq.push(Event::new("workflow.failed", json!({})), "e2".into());
        let criteria = ReprocessCriteria {
            event_type: Some("agent.error".into()),
            ..Default::default()
        };
        assert_eq!(dlq.select(&criteria).len(), 1);
    }
}
