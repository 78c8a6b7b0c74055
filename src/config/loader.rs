//! Configuration file loader
//! Loads a TOML configuration file; missing keys keep their defaults

use std::fs;
use std::path::Path;
use tracing::info;

use crate::config::AppConfig;
use crate::error::{IntegrityError, Result};

impl AppConfig {
    /// Load and validate configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {:?}", path);

        if !path.exists() {
            return Err(IntegrityError::ConfigError(format!(
                "Configuration file not found: {:?}",
                path
            )));
        }

        let contents = fs::read_to_string(path).map_err(|e| {
            IntegrityError::ConfigError(format!("Failed to read {:?}: {}", path, e))
        })?;

        let config = Self::from_toml_str(&contents).map_err(|e| match e {
            IntegrityError::ConfigError(msg) => {
                IntegrityError::ConfigError(format!("{:?}: {}", path, msg))
            }
            other => other,
        })?;

        info!("Configuration loaded: {} signatures", config.hash_algorithm);
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)
            .map_err(|e| IntegrityError::ConfigError(format!("Failed to parse: {}", e)))?;
        config.validate()?;
        Ok(config)
    }
}
