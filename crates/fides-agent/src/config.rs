//! Client configuration loading.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::AgentError;

/// Configuration recognized by a Fides client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Base URL of the identity registry.
    #[serde(rename = "discoveryUrl", default = "default_discovery_url")]
    pub discovery_url: String,

    /// Base URL of the trust graph service.
    #[serde(rename = "trustUrl", default = "default_trust_url")]
    pub trust_url: String,

    /// Directory holding on-disk key records.
    #[serde(rename = "keyDir", default = "default_key_dir")]
    pub key_dir: PathBuf,

    /// The identifier this agent signs with.
    #[serde(rename = "activeIdentifier", default)]
    pub active_identifier: Option<String>,
}

fn default_discovery_url() -> String {
    "http://localhost:4001".into()
}
fn default_trust_url() -> String {
    "http://localhost:4002".into()
}
fn default_key_dir() -> PathBuf {
    PathBuf::from(".fides/keys")
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            discovery_url: default_discovery_url(),
            trust_url: default_trust_url(),
            key_dir: default_key_dir(),
            active_identifier: None,
        }
    }
}

impl AgentConfig {
    /// Load config from a TOML file, falling back to defaults for missing
    /// fields. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, AgentError> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .map_err(|e| AgentError::Config(e.to_string()))?;
            toml::from_str(&contents).map_err(|e| AgentError::Config(e.to_string()))
        } else {
            Ok(Self::default())
        }
    }

    /// Save the current config to a TOML file.
    pub fn save(&self, path: &Path) -> Result<(), AgentError> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| AgentError::Config(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AgentError::Config(e.to_string()))?;
        }
        std::fs::write(path, contents).map_err(|e| AgentError::Config(e.to_string()))
    }
}
