use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of `POST /v1/trust`: an attestation submitted for persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTrustRequest {
    #[serde(rename = "issuerDid")]
    pub issuer_did: String,
    #[serde(rename = "subjectDid")]
    pub subject_did: String,
    /// Carried as a JSON number; validated to be an integer in 0..=100.
    #[serde(rename = "trustLevel")]
    pub trust_level: serde_json::Number,
    /// Hex-encoded 64-byte Ed25519 signature over `payload`.
    pub signature: String,
    /// The exact attestation payload that was signed.
    pub payload: String,
    #[serde(rename = "expiresAt", default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Response of `POST /v1/trust`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTrustResponse {
    pub id: i64,
    #[serde(rename = "issuerDid")]
    pub issuer_did: String,
    #[serde(rename = "subjectDid")]
    pub subject_did: String,
    #[serde(rename = "trustLevel")]
    pub trust_level: u8,
}

/// Response of `GET /v1/trust/{did}/score`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustScoreResponse {
    pub did: String,
    pub score: f64,
    #[serde(rename = "directTrusters")]
    pub direct_trusters: usize,
    #[serde(rename = "transitiveTrusters")]
    pub transitive_trusters: usize,
    #[serde(rename = "lastComputed")]
    pub last_computed: DateTime<Utc>,
}
