//! Tamper-evidence for neuropsychographic profile entries.
//!
//! Entries are signed with a salted content hash, collected into a Merkle
//! tree, and diffed into audit trails as the profile changes. The signature
//! is an integrity checksum: it detects accidental or after-the-fact
//! changes, but without a secret key it does not prove who wrote an entry.

pub mod audit;
pub mod config;
pub mod crypto;
pub mod error;
pub mod profile;

pub use audit::{
    build_merkle_tree, generate_audit_trail, generate_proof, validate_data_integrity,
    verify_proof, AuditTrail, IntegrityReport, MerkleProof, MerkleTree,
};
pub use config::AppConfig;
pub use crypto::{EntrySignature, HashAlgorithm, SignatureService};
pub use error::IntegrityError;
pub use profile::{Entry, EntryKind, ProfileSession};
