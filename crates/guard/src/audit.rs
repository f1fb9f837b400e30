//! Guard audit log — bounded in-memory record of blocked attempts.
//!
//! Blocked inputs are not persisted as conversation turns; this log is the
//! only trace they leave, for operator review.

use chrono::{DateTime, Utc};
use mindhaven_core::guard::InputBlockReason;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Maximum entries kept before the oldest are dropped.
const MAX_AUDIT_ENTRIES: usize = 5_000;

/// One blocked attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardAuditEntry {
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    pub reason: InputBlockReason,
    /// First characters of the offending message
    pub preview: String,
}

/// Thread-safe, bounded audit log.
pub struct GuardAudit {
    entries: Mutex<VecDeque<GuardAuditEntry>>,
}

impl Default for GuardAudit {
    fn default() -> Self {
        Self::new()
    }
}

impl GuardAudit {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
        }
    }

    /// Record a blocked attempt.
    pub fn record(&self, user_id: &str, reason: InputBlockReason, message: &str) {
        let entry = GuardAuditEntry {
            timestamp: Utc::now(),
            user_id: user_id.into(),
            reason,
            preview: message.chars().take(60).collect(),
        };

        let mut entries = self.entries.lock().unwrap();
        if entries.len() >= MAX_AUDIT_ENTRIES {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// The most recent `limit` entries, newest first.
    pub fn recent(&self, limit: usize) -> Vec<GuardAuditEntry> {
        let entries = self.entries.lock().unwrap();
        entries.iter().rev().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_lists_newest_first() {
        let audit = GuardAudit::new();
        audit.record("u1", InputBlockReason::MessageTooLong, "aaaa");
        audit.record("u1", InputBlockReason::PromptInjection, "ignore previous");

        let recent = audit.recent(10);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].reason, InputBlockReason::PromptInjection);
        assert_eq!(recent[1].reason, InputBlockReason::MessageTooLong);
    }

    #[test]
    fn preview_is_truncated() {
        let audit = GuardAudit::new();
        audit.record("u1", InputBlockReason::MessageTooLong, &"长".repeat(200));
        assert_eq!(audit.recent(1)[0].preview.chars().count(), 60);
    }

    #[test]
    fn bounded_capacity() {
        let audit = GuardAudit::new();
        for i in 0..MAX_AUDIT_ENTRIES + 10 {
            audit.record(&format!("u{i}"), InputBlockReason::SuspiciousPattern, "x");
        }
        assert_eq!(audit.len(), MAX_AUDIT_ENTRIES);
    }
}
