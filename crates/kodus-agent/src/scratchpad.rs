//! Bounded in-memory thought/action/observation log for the ReAct loop
//! (SPEC_FULL §F.2), grounded in `restflow-ai/src/agent/scratchpad.rs`.
//! The teacher's scratchpad is a file-backed JSONL debug trail; this one is
//! in-memory because its consumer is the next prompt build, not a log file.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct ScratchpadEntry {
    pub timestamp: DateTime<Utc>,
    pub iteration: usize,
    pub event_type: String,
    pub data: Value,
}

pub struct Scratchpad {
    capacity: usize,
    entries: Mutex<VecDeque<ScratchpadEntry>>,
}

impl Scratchpad {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn append(&self, iteration: usize, event_type: impl Into<String>, data: Value) {
        let mut entries = self.entries.lock();
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(ScratchpadEntry {
            timestamp: Utc::now(),
            iteration,
            event_type: event_type.into(),
            data,
        });
    }

    pub fn entries(&self) -> Vec<ScratchpadEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    /// Renders the transcript as a compact text block for the next prompt.
    pub fn render(&self) -> String {
        self.entries()
            .iter()
            .map(|e| format!("[{}] {}: {}", e.iteration, e.event_type, e.data))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn evicts_oldest_entry_beyond_capacity() {
        let scratchpad = Scratchpad::new(2);
        scratchpad.append(0, "thought", json!("a"));
        scratchpad.append(1, "thought", json!("b"));
        scratchpad.append(2, "thought", json!("c"));
        let entries = scratchpad.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].data, json!("b"));
        assert_eq!(entries[1].data, json!("c"));
    }
}
