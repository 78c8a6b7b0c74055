//! Audit Trail Generator
//!
//! Diffs two entry collections taken before and after a profile edit and
//! re-checks every signature in the resulting collection. Read-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::profile::Entry;

/// Classification of a single change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Added,
    Modified,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditChange {
    #[serde(rename = "type")]
    pub change_type: ChangeType,
    pub entry_id: String,
    pub timestamp: DateTime<Utc>,
    /// Content hash after the change, or before it for removals
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditTrail {
    pub changes: Vec<AuditChange>,
    pub integrity_maintained: bool,
}

impl AuditTrail {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn count(&self, change_type: ChangeType) -> usize {
        self.changes
            .iter()
            .filter(|c| c.change_type == change_type)
            .count()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} added, {} modified, {} removed; integrity {}",
            self.count(ChangeType::Added),
            self.count(ChangeType::Modified),
            self.count(ChangeType::Removed),
            if self.integrity_maintained { "maintained" } else { "broken" }
        )
    }
}

/// Diff `before` against `after` by entry id.
///
/// Added and modified changes follow the order of `after`; removals follow
/// the order of `before`. When an id repeats within one list the last
/// occurrence wins.
pub fn generate_audit_trail(before: &[Entry], after: &[Entry]) -> AuditTrail {
    let timestamp = Utc::now();
    let before_index: HashMap<&str, &Entry> = before.iter().map(|e| (e.id.as_str(), e)).collect();
    let after_index: HashMap<&str, &Entry> = after.iter().map(|e| (e.id.as_str(), e)).collect();

    let mut changes = Vec::new();

    for entry in after {
        // Only report the occurrence the index resolved to
        if !std::ptr::eq(after_index[entry.id.as_str()], entry) {
            continue;
        }

        let hash = entry.content_hash();
        let change_type = match before_index.get(entry.id.as_str()) {
            None => ChangeType::Added,
            Some(previous) if previous.content_hash() != hash => ChangeType::Modified,
            Some(_) => continue,
        };

        debug!("Entry {} {:?}", entry.id, change_type);
        changes.push(AuditChange {
            change_type,
            entry_id: entry.id.clone(),
            timestamp,
            hash,
        });
    }

    for entry in before {
        if !std::ptr::eq(before_index[entry.id.as_str()], entry)
            || after_index.contains_key(entry.id.as_str())
        {
            continue;
        }

        debug!("Entry {} Removed", entry.id);
        changes.push(AuditChange {
            change_type: ChangeType::Removed,
            entry_id: entry.id.clone(),
            timestamp,
            hash: entry.content_hash(),
        });
    }

    let integrity_maintained = after.iter().all(|entry| {
        let valid = entry.verify_signature();
        if !valid {
            warn!("Signature mismatch on entry {}", entry.id);
        }
        valid
    });

    let trail = AuditTrail {
        changes,
        integrity_maintained,
    };
    info!("Audit trail: {}", trail.summary());
    trail
}
