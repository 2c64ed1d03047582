use fides_identity::KeyError;

/// Attestation creation errors.
///
/// Verification never raises; `verify_attestation` reports `false` for any
/// failure so a hostile attestation cannot unwind the caller.
#[derive(Debug, thiserror::Error)]
pub enum AttestationError {
    #[error("invalid issuer identifier: {0}")]
    InvalidIssuer(String),

    #[error("invalid subject identifier: {0}")]
    InvalidSubject(String),

    #[error("trust level {0} is outside 0..=100")]
    TrustLevelOutOfRange(i64),

    #[error("payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<KeyError> for AttestationError {
    fn from(e: KeyError) -> Self {
        AttestationError::InvalidIssuer(e.to_string())
    }
}
