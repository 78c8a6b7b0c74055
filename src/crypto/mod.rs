//! Hashing and signing primitives

pub mod hash;
pub mod signatures;

pub use hash::{canonical_json, hash_bytes, hash_value, HashAlgorithm};
pub use signatures::{verify_signature, EntrySignature, SignatureService};
