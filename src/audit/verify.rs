//! Integrity Verification
//!
//! Re-checks entry signatures across a whole collection. Failures are
//! reported as data so callers can render an integrity badge directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{info, warn};

use crate::profile::Entry;

/// Integrity report over an entry collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityReport {
    pub is_valid: bool,
    pub total_entries: usize,
    pub valid_entries: usize,
    pub compromised_entries: Vec<String>,
    /// Percentage of entries whose signature still validates
    pub integrity_score: f64,
    pub verified_at: DateTime<Utc>,
}

impl IntegrityReport {
    /// Get a human-readable summary
    pub fn summary(&self) -> String {
        if self.is_valid {
            format!("✅ Profile data is intact ({} entries)", self.total_entries)
        } else {
            format!(
                "❌ {} of {} entries compromised (score {:.1})",
                self.compromised_entries.len(),
                self.total_entries,
                self.integrity_score
            )
        }
    }

    /// Get detailed status
    pub fn detailed_status(&self) -> String {
        format!(
            "Entries: {}\nValid: {}\nCompromised: {}\nScore: {:.1}\nVerified at: {}",
            self.total_entries,
            self.valid_entries,
            if self.compromised_entries.is_empty() {
                "None".to_string()
            } else {
                self.compromised_entries.join(", ")
            },
            self.integrity_score,
            self.verified_at.to_rfc3339()
        )
    }
}

/// Verify every entry's signature and score the collection
pub fn validate_data_integrity(entries: &[Entry]) -> IntegrityReport {
    let compromised_entries: Vec<String> = find_compromised_entries(entries)
        .into_iter()
        .map(|i| entries[i].id.clone())
        .collect();

    let total_entries = entries.len();
    let valid_entries = total_entries - compromised_entries.len();
    let integrity_score = if total_entries == 0 {
        100.0
    } else {
        valid_entries as f64 / total_entries as f64 * 100.0
    };

    let report = IntegrityReport {
        is_valid: compromised_entries.is_empty(),
        total_entries,
        valid_entries,
        compromised_entries,
        integrity_score,
        verified_at: Utc::now(),
    };

    info!(
        "Integrity check: {}/{} valid (score {:.1})",
        report.valid_entries, report.total_entries, report.integrity_score
    );
    report
}

/// Indexes of entries whose signature no longer matches their content
pub fn find_compromised_entries(entries: &[Entry]) -> Vec<usize> {
    let mut compromised = Vec::new();

    for (i, entry) in entries.iter().enumerate() {
        if !entry.verify_signature() {
            warn!("Entry {} failed signature verification", entry.id);
            compromised.push(i);
        }
    }

    compromised
}

/// Ids appearing more than once, in order of their second appearance
pub fn detect_duplicate_ids(entries: &[Entry]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();

    for entry in entries {
        if !seen.insert(entry.id.as_str()) && !duplicates.contains(&entry.id) {
            duplicates.push(entry.id.clone());
        }
    }

    duplicates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::SignatureService;
    use crate::profile::EntryKind;
    use serde_json::json;

    fn create_entries(count: usize) -> Vec<Entry> {
        let signer = SignatureService::default();
        (0..count)
            .map(|i| {
                Entry::with_id(
                    format!("e{}", i),
                    EntryKind::Assessment,
                    json!({"question": i, "answer": "often"}),
                    &signer,
                )
                .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_intact_collection() {
        let entries = create_entries(3);
        let report = validate_data_integrity(&entries);

        assert!(report.is_valid);
        assert_eq!(report.valid_entries, 3);
        assert_eq!(report.integrity_score, 100.0);
        assert!(report.summary().contains("✅"));
    }

    #[test]
    fn test_one_compromised_entry() {
        let mut entries = create_entries(4);
        entries[2].content = json!({"question": 2, "answer": "never"});

        let report = validate_data_integrity(&entries);
        assert!(!report.is_valid);
        assert_eq!(report.compromised_entries, vec!["e2".to_string()]);
        assert_eq!(report.integrity_score, 75.0);
        assert!(report.detailed_status().contains("Compromised: e2"));
    }

    #[test]
    fn test_empty_collection_scores_full() {
        let report = validate_data_integrity(&[]);
        assert!(report.is_valid);
        assert_eq!(report.total_entries, 0);
        assert_eq!(report.integrity_score, 100.0);
    }

    #[test]
    fn test_find_compromised_entries() {
        let mut entries = create_entries(3);
        entries[0].signature.hash = "0".repeat(64);

        assert_eq!(find_compromised_entries(&entries), vec![0]);
    }

    #[test]
    fn test_detect_duplicate_ids() {
        let mut entries = create_entries(3);
        entries.push(entries[1].clone());
        entries.push(entries[1].clone());

        assert_eq!(detect_duplicate_ids(&entries), vec!["e1".to_string()]);
        assert!(detect_duplicate_ids(&entries[..3]).is_empty());
    }
}
