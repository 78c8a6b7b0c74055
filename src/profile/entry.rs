//! Profile Entry
//!
//! One atomic unit of self-reported profile data, signed at creation.
//! Entries are never edited in place; a revision produces a new entry
//! that keeps the id and creation time and carries a fresh signature.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;
use uuid::Uuid;

use crate::crypto::hash::{canonical_json, hash_bytes, HashAlgorithm};
use crate::crypto::signatures::{verify_signature, EntrySignature, SignatureService};
use crate::error::{IntegrityError, Result};

/// Closed set of entry kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Goal,
    Challenge,
    Strength,
    Preference,
    Reflection,
    Assessment,
    Interaction,
}

impl EntryKind {
    pub const ALL: [EntryKind; 7] = [
        EntryKind::Goal,
        EntryKind::Challenge,
        EntryKind::Strength,
        EntryKind::Preference,
        EntryKind::Reflection,
        EntryKind::Assessment,
        EntryKind::Interaction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Goal => "goal",
            EntryKind::Challenge => "challenge",
            EntryKind::Strength => "strength",
            EntryKind::Preference => "preference",
            EntryKind::Reflection => "reflection",
            EntryKind::Assessment => "assessment",
            EntryKind::Interaction => "interaction",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryKind {
    type Err = IntegrityError;

    fn from_str(s: &str) -> Result<Self> {
        let tag = s.trim().to_ascii_lowercase();
        EntryKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == tag)
            .ok_or_else(|| IntegrityError::unknown_entry_kind(s))
    }
}

/// Signed profile entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: String,
    pub kind: EntryKind,
    pub content: Value,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
    pub signature: EntrySignature,
}

impl Entry {
    /// Create and sign a new entry with a generated id
    pub fn create(kind: EntryKind, content: Value, signer: &SignatureService) -> Result<Self> {
        Self::with_id(Uuid::new_v4().to_string(), kind, content, signer)
    }

    /// Create and sign a new entry with a caller-supplied id
    pub fn with_id(
        id: impl Into<String>,
        kind: EntryKind,
        content: Value,
        signer: &SignatureService,
    ) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(IntegrityError::InvalidEntry("Entry id must not be empty".to_string()));
        }

        let signature = signer.sign(&content)?;
        debug!("Created {} entry {}", kind, id);

        Ok(Self {
            id,
            kind,
            content,
            created_at: signature.timestamp,
            metadata: BTreeMap::new(),
            signature,
        })
    }

    /// Attach a metadata value; metadata never affects hashes
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Produce a re-signed revision carrying new content
    pub fn revise(&self, content: Value, signer: &SignatureService) -> Result<Self> {
        let signature = signer.sign(&content)?;
        debug!("Revised entry {}", self.id);

        Ok(Self {
            id: self.id.clone(),
            kind: self.kind,
            content,
            created_at: self.created_at,
            metadata: self.metadata.clone(),
            signature,
        })
    }

    /// Fields that identify this entry inside a Merkle leaf.
    ///
    /// Timestamps are reduced to unix milliseconds and metadata is left out.
    pub fn canonical_fields(&self) -> Value {
        json!({
            "id": self.id,
            "kind": self.kind.as_str(),
            "content": self.content,
            "createdAt": self.created_at.timestamp_millis(),
            "signature": {
                "algorithm": self.signature.algorithm.name(),
                "hash": self.signature.hash,
                "salt": self.signature.salt,
                "timestamp": self.signature.timestamp.timestamp_millis(),
            },
        })
    }

    /// SHA-256 of the canonical content, used to detect modifications
    pub fn content_hash(&self) -> String {
        hash_bytes(canonical_json(&self.content).as_bytes(), HashAlgorithm::Sha256)
    }

    /// Check the stored signature against the current content
    pub fn verify_signature(&self) -> bool {
        verify_signature(&self.content, &self.signature)
    }

    pub fn summary(&self) -> String {
        format!("{}: {} ({})", self.kind, self.id, self.signature.hash)
    }
}
