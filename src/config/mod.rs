pub mod loader;

use serde::{Deserialize, Serialize};
use std::env;

use crate::crypto::signatures::{SignatureService, DEFAULT_SALT_BYTES, MIN_SALT_BYTES};
use crate::crypto::HashAlgorithm;
use crate::error::{IntegrityError, Result};
use crate::profile::DEFAULT_HISTORY_LIMIT;

pub const DEFAULT_LOG_FILTER: &str = "npr_integrity=info";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub hash_algorithm: HashAlgorithm,
    pub salt_bytes: usize,
    pub history_limit: usize,
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            hash_algorithm: HashAlgorithm::Sha256,
            salt_bytes: DEFAULT_SALT_BYTES,
            history_limit: DEFAULT_HISTORY_LIMIT,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl AppConfig {
    /// Load from `NPR_*` environment variables, falling back to defaults
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let hash_algorithm = match lookup("NPR_HASH_ALGORITHM") {
            Some(name) => name.parse()?,
            None => defaults.hash_algorithm,
        };

        let salt_bytes = parse_usize(&lookup, "NPR_SALT_BYTES", defaults.salt_bytes)?;
        let history_limit = parse_usize(&lookup, "NPR_HISTORY_LIMIT", defaults.history_limit)?;
        let log_filter = lookup("NPR_LOG_FILTER").unwrap_or(defaults.log_filter);

        let config = AppConfig {
            hash_algorithm,
            salt_bytes,
            history_limit,
            log_filter,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.salt_bytes < MIN_SALT_BYTES {
            return Err(IntegrityError::salt_too_short(self.salt_bytes, MIN_SALT_BYTES));
        }
        if self.history_limit == 0 {
            return Err(IntegrityError::ConfigError(
                "History limit must be at least 1".to_string(),
            ));
        }
        if self.log_filter.trim().is_empty() {
            return Err(IntegrityError::ConfigError(
                "Log filter must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Signing service for this configuration
    pub fn signature_service(&self) -> Result<SignatureService> {
        SignatureService::new(self.hash_algorithm, self.salt_bytes)
    }
}

fn parse_usize<F>(lookup: &F, key: &str, default: usize) -> Result<usize>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e| {
            IntegrityError::ConfigError(format!("Invalid value for {}: {} ({})", key, raw, e))
        }),
        None => Ok(default),
    }
}
