//! Audit Integrity System
//!
//! Tamper-evidence for profile entries: Merkle tree construction and
//! inclusion proofs, before/after audit trails, and signature sweeps.

pub mod merkle;
pub mod trail;
pub mod verify;

pub use merkle::{
    build_merkle_tree, generate_proof, generate_proof_for_id, get_merkle_root, verify_entry_proof,
    verify_merkle_root, verify_proof, MerkleNode, MerkleProof, MerkleTree, ProofStep,
};
pub use trail::{generate_audit_trail, AuditChange, AuditTrail, ChangeType};
pub use verify::{validate_data_integrity, IntegrityReport};
