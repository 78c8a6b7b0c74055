//! Signature Service
//!
//! Attaches a salted content hash to a record and re-derives it later.
//! This is an integrity checksum, not an authentication primitive: there is
//! no secret key, so anyone able to run this code can re-sign altered data.
//! A passing check only proves the data is unchanged since it was signed.

use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::crypto::hash::{self, HashAlgorithm};
use crate::error::{IntegrityError, Result};

/// Smallest salt accepted by the service
pub const MIN_SALT_BYTES: usize = 8;

/// Default salt length in bytes
pub const DEFAULT_SALT_BYTES: usize = 16;

/// Salted hash binding a payload at signing time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntrySignature {
    pub algorithm: HashAlgorithm,
    pub hash: String,
    pub salt: String,
    pub timestamp: DateTime<Utc>,
}

pub struct SignatureService {
    algorithm: HashAlgorithm,
    salt_bytes: usize,
}

impl SignatureService {
    /// Create a service after checking the digest primitive answers correctly
    pub fn new(algorithm: HashAlgorithm, salt_bytes: usize) -> Result<Self> {
        if salt_bytes < MIN_SALT_BYTES {
            return Err(IntegrityError::salt_too_short(salt_bytes, MIN_SALT_BYTES));
        }
        hash::self_test(algorithm)?;

        Ok(Self {
            algorithm,
            salt_bytes,
        })
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Sign `data` with a fresh salt and the current time
    pub fn sign<T: Serialize + ?Sized>(&self, data: &T) -> Result<EntrySignature> {
        let salt = self.generate_salt();
        let timestamp = Utc::now();
        let hash = signing_hash(data, &salt, &timestamp, self.algorithm)?;

        debug!("Signed payload with {} ({})", self.algorithm, hash);
        Ok(EntrySignature {
            algorithm: self.algorithm,
            hash,
            salt,
            timestamp,
        })
    }

    /// Check `data` against a previously issued signature
    pub fn verify<T: Serialize + ?Sized>(&self, data: &T, signature: &EntrySignature) -> bool {
        verify_signature(data, signature)
    }

    fn generate_salt(&self) -> String {
        let mut salt = vec![0u8; self.salt_bytes];
        OsRng.fill_bytes(&mut salt);
        hex::encode(salt)
    }
}

impl Default for SignatureService {
    fn default() -> Self {
        Self {
            algorithm: HashAlgorithm::Sha256,
            salt_bytes: DEFAULT_SALT_BYTES,
        }
    }
}

/// Recompute the signing hash under the signature's declared algorithm.
///
/// Returns false rather than an error when the payload cannot be
/// serialized; a check that cannot run has not passed.
pub fn verify_signature<T: Serialize + ?Sized>(data: &T, signature: &EntrySignature) -> bool {
    if signature.hash.len() != signature.algorithm.hex_len() {
        warn!(
            "Malformed {} signature hash: {} hex chars, expected {}",
            signature.algorithm,
            signature.hash.len(),
            signature.algorithm.hex_len()
        );
        return false;
    }

    match signing_hash(data, &signature.salt, &signature.timestamp, signature.algorithm) {
        Ok(computed) => computed == signature.hash,
        Err(e) => {
            warn!("Signature verification could not serialize payload: {}", e);
            false
        }
    }
}

fn signing_hash<T: Serialize + ?Sized>(
    data: &T,
    salt: &str,
    timestamp: &DateTime<Utc>,
    algorithm: HashAlgorithm,
) -> Result<String> {
    let payload = json!({
        "data": serde_json::to_value(data)?,
        "salt": salt,
        "timestamp": timestamp.timestamp_millis(),
    });
    hash::hash_value(&payload, algorithm)
}
