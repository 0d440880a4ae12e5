//! Metadata shared by every entity: generation counters and status conditions.
//!
//! Grounded on §3's "every entity carries metadata with creation/update
//! generation counters and a list of status conditions" and the expansion in
//! SPEC_FULL.md §3.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionKind {
    Ready,
    Synced,
    Validated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    pub kind: ConditionKind,
    pub status: bool,
    pub reason: String,
    pub message: String,
    pub observed_generation: u64,
}

impl Condition {
    pub fn new(kind: ConditionKind, status: bool, reason: impl Into<String>, observed_generation: u64) -> Self {
        Self {
            kind,
            status,
            reason: reason.into(),
            message: String::new(),
            observed_generation,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meta {
    pub generation: u64,
    pub resource_version: u64,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub conditions: Vec<Condition>,
}

impl Meta {
    pub fn new(now: OffsetDateTime) -> Self {
        Self {
            generation: 1,
            resource_version: 1,
            created_at: now,
            updated_at: now,
            conditions: Vec::new(),
        }
    }

    /// Bumps both counters, as a spec-affecting write does.
    pub fn touch_spec(&mut self, now: OffsetDateTime) {
        self.generation += 1;
        self.resource_version += 1;
        self.updated_at = now;
    }

    /// Bumps only the resource version, as a status-only write does.
    pub fn touch_status(&mut self, now: OffsetDateTime) {
        self.resource_version += 1;
        self.updated_at = now;
    }

    pub fn condition(&self, kind: ConditionKind) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.kind == kind)
    }

    pub fn is_ready(&self) -> bool {
        self.condition(ConditionKind::Ready).is_some_and(|c| c.status)
    }

    pub fn set_condition(&mut self, condition: Condition) {
        if let Some(existing) = self.conditions.iter_mut().find(|c| c.kind == condition.kind) {
            *existing = condition;
        } else {
            self.conditions.push(condition);
        }
    }
}
