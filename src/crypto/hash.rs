//! Hash Primitive
//!
//! Deterministic content hashing over canonical JSON. Every structured
//! value is reduced to compact JSON with object keys sorted at every depth
//! before it reaches the digest, so key order never changes a hash.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256, Sha512};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::error::{IntegrityError, Result};

/// Supported digest algorithms; deserialized with the same rules as `FromStr`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "String")]
pub enum HashAlgorithm {
    #[default]
    #[serde(rename = "sha-256")]
    Sha256,
    #[serde(rename = "sha-512")]
    Sha512,
}

impl HashAlgorithm {
    pub fn name(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha-256",
            HashAlgorithm::Sha512 => "sha-512",
        }
    }

    /// Hex length of a digest produced by this algorithm
    pub fn hex_len(&self) -> usize {
        match self {
            HashAlgorithm::Sha256 => 64,
            HashAlgorithm::Sha512 => 128,
        }
    }

    /// Known-answer digest of `b"abc"` (FIPS 180-2 test vectors)
    fn known_answer(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => {
                "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
            }
            HashAlgorithm::Sha512 => {
                "ddaf35a193617abacc417349ae20413112e6fa4e89a97ea20a9eeee64b55d39a2192992a274fc1a836ba3c23a3feebbd454d4423643ce80e2a9ac94fa54ca49f"
            }
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = IntegrityError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(HashAlgorithm::Sha256),
            "sha512" | "sha-512" => Ok(HashAlgorithm::Sha512),
            other => Err(IntegrityError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

impl TryFrom<String> for HashAlgorithm {
    type Error = IntegrityError;

    fn try_from(name: String) -> Result<Self> {
        name.parse()
    }
}

/// Hash raw bytes and return the lowercase hex digest
pub fn hash_bytes(bytes: &[u8], algorithm: HashAlgorithm) -> String {
    match algorithm {
        HashAlgorithm::Sha256 => hex::encode(Sha256::digest(bytes)),
        HashAlgorithm::Sha512 => hex::encode(Sha512::digest(bytes)),
    }
}

/// Hash any serializable value through its canonical JSON form
pub fn hash_value<T: Serialize + ?Sized>(data: &T, algorithm: HashAlgorithm) -> Result<String> {
    let canonical = canonical_json(&serde_json::to_value(data)?);
    Ok(hash_bytes(canonical.as_bytes(), algorithm))
}

/// Compact JSON with object keys sorted lexicographically at every depth
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();

            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                // Strings always serialize
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                write_canonical(&map[*key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Run a known-answer test against the linked digest implementation
pub fn self_test(algorithm: HashAlgorithm) -> Result<()> {
    let computed = hash_bytes(b"abc", algorithm);
    if computed != algorithm.known_answer() {
        return Err(IntegrityError::DigestUnavailable(format!(
            "{} known-answer test failed",
            algorithm
        )));
    }
    debug!("{} digest self-test passed", algorithm);
    Ok(())
}
