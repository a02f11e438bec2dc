//! Multi-agent delegation primitives (spec §3 "Tracked Message / Delegation /
//! Capability"). Used only by multi-agent mode; single-agent callers never
//! touch this module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

use crate::message::Message;

/// Ordered inbox of messages addressed to one named agent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackedMessage {
    pub agent_name: String,
    pub inbox: VecDeque<Message>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delegation {
    pub id: String,
    pub origin: String,
    pub target: String,
    pub deadline: Option<DateTime<Utc>>,
}

impl Delegation {
    pub fn new(origin: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            origin: origin.into(),
            target: target.into(),
            deadline: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Capability {
    pub tags: HashSet<String>,
}

impl Capability {
    pub fn has(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

/// Mapping used by the multi-agent coordinator: agent name -> inbox.
pub type Inboxes = HashMap<String, TrackedMessage>;
