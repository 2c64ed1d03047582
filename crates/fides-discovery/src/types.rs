use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of `POST /identities`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterIdentityRequest {
    pub did: String,
    /// Hex-encoded 32-byte Ed25519 public key (64 characters).
    #[serde(rename = "publicKey")]
    pub public_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

/// An identity as stored and served by the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub did: String,
    #[serde(rename = "publicKey")]
    pub public_key: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(rename = "firstSeen")]
    pub first_seen: DateTime<Utc>,
    #[serde(rename = "lastSeen")]
    pub last_seen: DateTime<Utc>,
}

/// A service's self-description at `/.well-known/fides.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryDocument {
    pub did: String,
    #[serde(rename = "publicKey")]
    pub public_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}
