//! Profile Session
//!
//! Single-writer owner of one profile-editing session: the entry list, the
//! Merkle tree built over it and a bounded history of audit trails. Clones
//! share the same state, and every mutation holds the lock from diff to
//! rebuild so two rebuilds never interleave on one leaf list.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::audit::merkle::{build_merkle_tree, generate_proof_for_id, MerkleProof, MerkleTree};
use crate::audit::trail::{generate_audit_trail, AuditTrail};
use crate::audit::verify::{detect_duplicate_ids, validate_data_integrity, IntegrityReport};
use crate::crypto::SignatureService;
use crate::error::{IntegrityError, Result};
use crate::profile::entry::{Entry, EntryKind};

/// Default number of audit records retained per session
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Audit trail of one mutation with the roots on either side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub trail: AuditTrail,
    pub root_before: Option<String>,
    pub root_after: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

struct SessionState {
    entries: Vec<Entry>,
    tree: Option<MerkleTree>,
    history: VecDeque<AuditRecord>,
}

#[derive(Clone)]
pub struct ProfileSession {
    signer: Arc<SignatureService>,
    state: Arc<Mutex<SessionState>>,
    history_limit: usize,
}

impl ProfileSession {
    /// Create an empty session
    pub fn new(signer: SignatureService, history_limit: usize) -> Self {
        Self::with_state(signer, Vec::new(), None, history_limit)
    }

    /// Resume a session from previously stored entries.
    ///
    /// Entries are taken as-is, including ones whose signature no longer
    /// validates; that shows up in `integrity_report`.
    pub fn from_entries(
        signer: SignatureService,
        entries: Vec<Entry>,
        history_limit: usize,
    ) -> Result<Self> {
        if let Some(duplicate) = detect_duplicate_ids(&entries).first() {
            return Err(IntegrityError::InvalidEntry(format!(
                "Duplicate entry id: {}",
                duplicate
            )));
        }

        let tree = if entries.is_empty() {
            None
        } else {
            Some(build_merkle_tree(&entries)?)
        };

        info!("Resumed profile session with {} entries", entries.len());
        Ok(Self::with_state(signer, entries, tree, history_limit))
    }

    fn with_state(
        signer: SignatureService,
        entries: Vec<Entry>,
        tree: Option<MerkleTree>,
        history_limit: usize,
    ) -> Self {
        Self {
            signer: Arc::new(signer),
            state: Arc::new(Mutex::new(SessionState {
                entries,
                tree,
                history: VecDeque::new(),
            })),
            history_limit: history_limit.max(1),
        }
    }

    /// Create, sign and insert a new entry
    pub async fn add_entry(&self, kind: EntryKind, content: Value) -> Result<Entry> {
        let entry = Entry::create(kind, content, &self.signer)?;
        let mut state = self.state.lock().await;

        let mut entries = state.entries.clone();
        entries.push(entry.clone());
        self.apply(&mut state, entries)?;

        debug!("Added entry {}", entry.summary());
        Ok(entry)
    }

    /// Insert an entry signed elsewhere, replacing any entry with its id
    pub async fn insert_entry(&self, entry: Entry) -> Result<()> {
        if !entry.verify_signature() {
            warn!("Rejected entry {} with invalid signature", entry.id);
            return Err(IntegrityError::InvalidEntry(format!(
                "Signature does not match content for entry {}",
                entry.id
            )));
        }

        let mut state = self.state.lock().await;
        let mut entries = state.entries.clone();
        match entries.iter().position(|e| e.id == entry.id) {
            Some(index) => entries[index] = entry,
            None => entries.push(entry),
        }
        self.apply(&mut state, entries)
    }

    /// Replace an entry's content with a re-signed revision
    pub async fn edit_entry(&self, id: &str, content: Value) -> Result<Entry> {
        let mut state = self.state.lock().await;
        let index = Self::position(&state, id)?;

        let revised = state.entries[index].revise(content, &self.signer)?;
        let mut entries = state.entries.clone();
        entries[index] = revised.clone();
        self.apply(&mut state, entries)?;

        debug!("Edited entry {}", revised.summary());
        Ok(revised)
    }

    /// Remove an entry, returning it
    pub async fn remove_entry(&self, id: &str) -> Result<Entry> {
        let mut state = self.state.lock().await;
        let index = Self::position(&state, id)?;

        let mut entries = state.entries.clone();
        let removed = entries.remove(index);
        self.apply(&mut state, entries)?;

        debug!("Removed entry {}", removed.id);
        Ok(removed)
    }

    pub async fn entries(&self) -> Vec<Entry> {
        self.state.lock().await.entries.clone()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.entries.is_empty()
    }

    /// Current Merkle root, or None for an empty session
    pub async fn root_hash(&self) -> Option<String> {
        let state = self.state.lock().await;
        state.tree.as_ref().map(|tree| tree.root_hash().to_string())
    }

    /// Inclusion proof for the entry with `id` against the current root
    pub async fn prove(&self, id: &str) -> Result<MerkleProof> {
        let state = self.state.lock().await;
        match &state.tree {
            Some(tree) => generate_proof_for_id(tree, id),
            None => Err(IntegrityError::EntryNotFound(id.to_string())),
        }
    }

    pub async fn integrity_report(&self) -> IntegrityReport {
        let state = self.state.lock().await;
        validate_data_integrity(&state.entries)
    }

    /// Audit records, oldest first
    pub async fn history(&self) -> Vec<AuditRecord> {
        self.state.lock().await.history.iter().cloned().collect()
    }

    fn position(state: &SessionState, id: &str) -> Result<usize> {
        state
            .entries
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| IntegrityError::EntryNotFound(id.to_string()))
    }

    /// Rebuild over `entries` and record the trail; state is untouched on error
    fn apply(&self, state: &mut SessionState, entries: Vec<Entry>) -> Result<()> {
        let tree = if entries.is_empty() {
            None
        } else {
            Some(build_merkle_tree(&entries)?)
        };

        let record = AuditRecord {
            trail: generate_audit_trail(&state.entries, &entries),
            root_before: state.tree.as_ref().map(|t| t.root_hash().to_string()),
            root_after: tree.as_ref().map(|t| t.root_hash().to_string()),
            recorded_at: Utc::now(),
        };

        if !record.trail.integrity_maintained {
            warn!("Profile integrity broken after mutation: {}", record.trail.summary());
        }

        state.entries = entries;
        state.tree = tree;
        state.history.push_back(record);
        while state.history.len() > self.history_limit {
            state.history.pop_front();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::trail::ChangeType;
    use serde_json::json;

    #[tokio::test]
    async fn test_add_edit_remove() {
        let session = ProfileSession::new(SignatureService::default(), DEFAULT_HISTORY_LIMIT);
        assert!(session.root_hash().await.is_none());

        let goal = session.add_entry(EntryKind::Goal, json!("Read daily")).await.unwrap();
        let root_one = session.root_hash().await.unwrap();

        let edited = session.edit_entry(&goal.id, json!("Read 20 minutes daily")).await.unwrap();
        assert_eq!(edited.id, goal.id);
        let root_two = session.root_hash().await.unwrap();
        assert_ne!(root_one, root_two);

        let removed = session.remove_entry(&goal.id).await.unwrap();
        assert_eq!(removed, edited);
        assert!(session.is_empty().await);
        assert!(session.root_hash().await.is_none());

        let history = session.history().await;
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].trail.changes[0].change_type, ChangeType::Added);
        assert_eq!(history[1].trail.changes[0].change_type, ChangeType::Modified);
        assert_eq!(history[2].trail.changes[0].change_type, ChangeType::Removed);
        assert_eq!(history[1].root_before.as_deref(), Some(root_one.as_str()));
        assert_eq!(history[2].root_after, None);
    }

    #[tokio::test]
    async fn test_missing_entry_errors() {
        let session = ProfileSession::new(SignatureService::default(), DEFAULT_HISTORY_LIMIT);

        assert!(matches!(
            session.edit_entry("nope", json!(1)).await,
            Err(IntegrityError::EntryNotFound(_))
        ));
        assert!(matches!(
            session.remove_entry("nope").await,
            Err(IntegrityError::EntryNotFound(_))
        ));
        assert!(matches!(
            session.prove("nope").await,
            Err(IntegrityError::EntryNotFound(_))
        ));
        assert!(session.history().await.is_empty());
    }

    #[tokio::test]
    async fn test_history_is_bounded() {
        let session = ProfileSession::new(SignatureService::default(), 2);
        for i in 0..5 {
            session.add_entry(EntryKind::Interaction, json!(i)).await.unwrap();
        }

        let history = session.history().await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].root_after, session.root_hash().await);
    }

    #[tokio::test]
    async fn test_insert_rejects_bad_signature() {
        let signer = SignatureService::default();
        let mut entry = Entry::with_id("e1", EntryKind::Strength, json!("focus"), &signer).unwrap();
        entry.content = json!("hyperfocus");

        let session = ProfileSession::new(signer, DEFAULT_HISTORY_LIMIT);
        assert!(matches!(
            session.insert_entry(entry).await,
            Err(IntegrityError::InvalidEntry(_))
        ));
        assert!(session.is_empty().await);
    }

    #[tokio::test]
    async fn test_from_entries_rejects_duplicates() {
        let signer = SignatureService::default();
        let entry = Entry::with_id("e1", EntryKind::Goal, json!("x"), &signer).unwrap();

        let result = ProfileSession::from_entries(signer, vec![entry.clone(), entry], 10);
        assert!(matches!(result, Err(IntegrityError::InvalidEntry(_))));
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let session = ProfileSession::new(SignatureService::default(), DEFAULT_HISTORY_LIMIT);
        let other = session.clone();

        let entry = other.add_entry(EntryKind::Preference, json!("dark mode")).await.unwrap();
        assert_eq!(session.len().await, 1);

        let proof = session.prove(&entry.id).await.unwrap();
        assert!(proof.verify());
        assert_eq!(Some(proof.root), session.root_hash().await);
    }
}
