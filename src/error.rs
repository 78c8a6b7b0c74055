use thiserror::Error;

impl From<serde_json::Error> for IntegrityError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(format!("JSON serialization error: {}", err))
    }
}

/// Structural errors raised by the integrity layer.
///
/// Verification outcomes (a bad signature, a broken proof) are never
/// reported through this type; they come back as plain data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntegrityError {
    #[error("Cannot build Merkle tree from empty entries")]
    EmptyEntries,

    #[error("Entry not found: {0}")]
    EntryNotFound(String),

    #[error("Unsupported hash algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Digest primitive unavailable: {0}")]
    DigestUnavailable(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid entry: {0}")]
    InvalidEntry(String),
}

pub type Result<T> = std::result::Result<T, IntegrityError>;

impl IntegrityError {
    pub fn unknown_entry_kind(tag: &str) -> Self {
        Self::InvalidEntry(format!(
            "Unknown entry kind: {}. Must be one of goal, challenge, strength, preference, reflection, assessment, interaction",
            tag
        ))
    }

    pub fn salt_too_short(bytes: usize, min: usize) -> Self {
        Self::ConfigError(format!(
            "Salt length too short: {} bytes (minimum {} required)",
            bytes, min
        ))
    }
}
