//! Merkle Tree for Profile Entries
//!
//! Builds a binary SHA-256 hash tree over an ordered list of signed entries
//! and produces inclusion proofs for single entries.
//!
//! Hashes are fixed so that any implementation reproduces the same root:
//!
//! - leaf: `SHA-256("leaf:" || canonical_json(entry.canonical_fields()))`
//! - node: `SHA-256("node:" || left_hex || right_hex)`
//!
//! A level with an odd node count pairs its last node with itself. As a
//! consequence `[A, B, C]` and `[A, B, C, C]` produce the same root, so the
//! leaf count must be carried alongside a root when that distinction matters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::crypto::hash::canonical_json;
use crate::error::{IntegrityError, Result};
use crate::profile::Entry;

const LEAF_PREFIX: &[u8] = b"leaf:";
const NODE_PREFIX: &[u8] = b"node:";

/// Merkle tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerkleNode {
    pub hash: String,
    pub left: Option<Box<MerkleNode>>,
    pub right: Option<Box<MerkleNode>>,
    pub entry: Option<Entry>,
    /// Build time; never part of a hash
    pub timestamp: DateTime<Utc>,
}

impl MerkleNode {
    /// Create leaf node from a profile entry
    pub fn leaf(entry: &Entry) -> Self {
        Self {
            hash: leaf_hash(entry),
            left: None,
            right: None,
            entry: Some(entry.clone()),
            timestamp: Utc::now(),
        }
    }

    /// Create internal node from two child nodes
    pub fn internal(left: MerkleNode, right: MerkleNode) -> Self {
        Self {
            hash: node_hash(&left.hash, &right.hash),
            left: Some(Box::new(left)),
            right: Some(Box::new(right)),
            entry: None,
            timestamp: Utc::now(),
        }
    }

    /// Pair a trailing node with a copy of itself
    pub fn single_child(child: MerkleNode) -> Self {
        Self::internal(child.clone(), child)
    }

    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}

/// Leaf hash of an entry
pub fn leaf_hash(entry: &Entry) -> String {
    let canonical = canonical_json(&entry.canonical_fields());
    let mut hasher = Sha256::new();
    hasher.update(LEAF_PREFIX);
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}

/// Combine two child hashes, left first
pub fn node_hash(left: &str, right: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(NODE_PREFIX);
    hasher.update(left.as_bytes());
    hasher.update(right.as_bytes());
    hex::encode(hasher.finalize())
}

/// Merkle tree over an ordered entry list.
///
/// Only `build_merkle_tree` constructs one, so the node structure and the
/// per-level hashes used for proofs always describe the same leaves.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    root: MerkleNode,
    leaves: Vec<MerkleNode>,
    depth: usize,
    /// Hashes per level, leaves first, root level last
    levels: Vec<Vec<String>>,
}

impl MerkleTree {
    pub fn root(&self) -> &MerkleNode {
        &self.root
    }

    pub fn leaves(&self) -> &[MerkleNode] {
        &self.leaves
    }

    /// Number of levels above the leaves
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn root_hash(&self) -> &str {
        &self.root.hash
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    pub fn leaf_hashes(&self) -> &[String] {
        &self.levels[0]
    }

    /// Entries in leaf order
    pub fn entries(&self) -> Vec<Entry> {
        self.leaves
            .iter()
            .filter_map(|leaf| leaf.entry.clone())
            .collect()
    }

    /// Index of the leaf carrying the entry with `id`
    pub fn find_leaf(&self, id: &str) -> Option<usize> {
        self.leaves
            .iter()
            .position(|leaf| leaf.entry.as_ref().map(|e| e.id.as_str()) == Some(id))
    }

    /// Rebuild with `entry` replacing the leaf of the same id, or appended
    pub fn upsert(&self, entry: Entry) -> Result<MerkleTree> {
        let mut entries = self.entries();
        match self.find_leaf(&entry.id) {
            Some(index) => entries[index] = entry,
            None => entries.push(entry),
        }
        build_merkle_tree(&entries)
    }

    /// Rebuild without the entry of `id`
    pub fn remove(&self, id: &str) -> Result<MerkleTree> {
        let index = self
            .find_leaf(id)
            .ok_or_else(|| IntegrityError::EntryNotFound(id.to_string()))?;

        let mut entries = self.entries();
        entries.remove(index);
        build_merkle_tree(&entries)
    }

    pub fn summary(&self) -> String {
        format!(
            "Merkle tree: {} leaves, depth {}, root: {}",
            self.leaves.len(),
            self.depth,
            self.root.hash
        )
    }
}

/// Build Merkle tree from profile entries
pub fn build_merkle_tree(entries: &[Entry]) -> Result<MerkleTree> {
    if entries.is_empty() {
        return Err(IntegrityError::EmptyEntries);
    }

    info!("Building Merkle tree from {} entries", entries.len());

    let leaves: Vec<MerkleNode> = entries.iter().map(MerkleNode::leaf).collect();
    let mut levels = vec![leaves.iter().map(|n| n.hash.clone()).collect::<Vec<_>>()];
    let mut nodes = leaves.clone();

    // Build tree bottom-up
    while nodes.len() > 1 {
        let mut next_level = Vec::with_capacity((nodes.len() + 1) / 2);
        let mut iter = nodes.into_iter();

        while let Some(left) = iter.next() {
            match iter.next() {
                Some(right) => next_level.push(MerkleNode::internal(left, right)),
                None => next_level.push(MerkleNode::single_child(left)),
            }
        }

        levels.push(next_level.iter().map(|n| n.hash.clone()).collect());
        nodes = next_level;
    }

    let root = nodes
        .pop()
        .ok_or(IntegrityError::EmptyEntries)?;
    let depth = levels.len() - 1;

    debug!("Merkle tree root: {} (depth {})", root.hash, depth);
    Ok(MerkleTree {
        root,
        leaves,
        depth,
        levels,
    })
}

/// Get Merkle root hash
pub fn get_merkle_root(entries: &[Entry]) -> Result<String> {
    let tree = build_merkle_tree(entries)?;
    Ok(tree.root.hash)
}

/// Verify Merkle root against entries
pub fn verify_merkle_root(entries: &[Entry], claimed_root: &str) -> Result<bool> {
    let actual_root = get_merkle_root(entries)?;
    Ok(actual_root == claimed_root)
}

/// One sibling on the path from a leaf to the root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofStep {
    pub hash: String,
    /// Sibling sits on the left, so replay computes `node(sibling, current)`
    pub is_left: bool,
}

/// Inclusion proof; `path` is ordered leaf-to-root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub leaf: String,
    pub path: Vec<ProofStep>,
    pub root: String,
}

impl MerkleProof {
    /// Verify this proof
    pub fn verify(&self) -> bool {
        verify_proof(self)
    }

    /// Get proof size
    pub fn size(&self) -> usize {
        self.path.len()
    }

    /// Get human-readable representation
    pub fn summary(&self) -> String {
        format!("Merkle proof: {} hashes, root: {}", self.path.len(), self.root)
    }
}

/// Generate Merkle proof for a specific entry
pub fn generate_proof(tree: &MerkleTree, entry: &Entry) -> Result<MerkleProof> {
    generate_proof_for_id(tree, &entry.id)
}

/// Generate Merkle proof for the entry with `id`
pub fn generate_proof_for_id(tree: &MerkleTree, id: &str) -> Result<MerkleProof> {
    let leaf_index = tree
        .find_leaf(id)
        .ok_or_else(|| IntegrityError::EntryNotFound(id.to_string()))?;

    let mut path = Vec::with_capacity(tree.depth);
    let mut index = leaf_index;

    for level in &tree.levels[..tree.levels.len() - 1] {
        let step = if index % 2 == 1 {
            ProofStep {
                hash: level[index - 1].clone(),
                is_left: true,
            }
        } else {
            // A trailing node is its own partner
            let sibling = level.get(index + 1).unwrap_or(&level[index]);
            ProofStep {
                hash: sibling.clone(),
                is_left: false,
            }
        };
        path.push(step);
        index /= 2;
    }

    debug!("Generated proof for {} with {} steps", id, path.len());
    Ok(MerkleProof {
        leaf: tree.levels[0][leaf_index].clone(),
        path,
        root: tree.root.hash.clone(),
    })
}

/// Verify Merkle proof
pub fn verify_proof(proof: &MerkleProof) -> bool {
    let computed = proof.path.iter().fold(proof.leaf.clone(), |current, step| {
        if step.is_left {
            node_hash(&step.hash, &current)
        } else {
            node_hash(&current, &step.hash)
        }
    });

    computed == proof.root
}

/// Verify a proof and that it was issued for `entry` as it is now
pub fn verify_entry_proof(proof: &MerkleProof, entry: &Entry) -> bool {
    proof.leaf == leaf_hash(entry) && verify_proof(proof)
}
