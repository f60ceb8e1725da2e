//! Session configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{CURRENT_VERSION, MAX_ARCHIVED_STATES, MAX_MESSAGES};

/// Errors that can occur while loading a configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Tunables for session establishment and retention.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SessionConfig {
    /// Protocol version stamped on outgoing sessions.
    pub protocol_version: u32,

    /// Maximum number of states kept per session (open + closed).
    pub max_archived_states: usize,

    /// Maximum number of skipped message keys cached per chain.
    pub max_skipped_message_keys: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            protocol_version: CURRENT_VERSION,
            max_archived_states: MAX_ARCHIVED_STATES,
            max_skipped_message_keys: MAX_MESSAGES,
        }
    }
}

impl SessionConfig {
    /// Loads a configuration from a TOML file. Missing fields take defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: SessionConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects bounds that would make sessions unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.protocol_version == 0 {
            return Err(ConfigError::Invalid(
                "protocol_version must be positive".to_string(),
            ));
        }
        if self.max_archived_states == 0 {
            return Err(ConfigError::Invalid(
                "max_archived_states must keep at least the current state".to_string(),
            ));
        }
        if self.max_skipped_message_keys == 0 {
            return Err(ConfigError::Invalid(
                "max_skipped_message_keys must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
