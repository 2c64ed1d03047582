use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted directed trust edge, unique on `(source, target)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustEdge {
    /// Primary key; edges are enumerated in ascending `id` order, which
    /// makes BFS results deterministic.
    pub id: i64,
    /// Issuer identifier (the truster).
    pub source: String,
    /// Subject identifier (the trusted).
    pub target: String,
    /// Trust level in 0..=100.
    pub level: u8,
    /// Identifier of the attestation that created this edge.
    pub attestation_id: String,
    /// Hex-encoded Ed25519 signature from the attestation.
    pub signature: String,
    /// The exact attestation payload that was signed.
    pub payload: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
}

/// Edge lifecycle. `Revoked` and `Expired` are terminal; only `Active`
/// edges participate in traversal and scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeStatus {
    Active,
    Revoked,
    Expired,
}

impl TrustEdge {
    /// Lifecycle state at `now`. Revocation takes precedence over expiry.
    pub fn status(&self, now: DateTime<Utc>) -> EdgeStatus {
        if self.revoked_at.is_some() {
            EdgeStatus::Revoked
        } else if matches!(self.expires_at, Some(expires) if expires <= now) {
            EdgeStatus::Expired
        } else {
            EdgeStatus::Active
        }
    }

    /// Whether the edge participates in traversal at `now`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.status(now) == EdgeStatus::Active
    }
}
