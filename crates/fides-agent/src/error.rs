use fides_attestation::AttestationError;
use fides_discovery::DiscoveryError;
use fides_httpsig::SignatureError;
use fides_identity::KeyError;

/// Errors surfaced by the agent assembly.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("no active identifier configured")]
    NoActiveIdentity,

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    Signature(#[from] SignatureError),

    #[error(transparent)]
    Attestation(#[from] AttestationError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error("trust service error ({status}): {message}")]
    TrustService { status: u16, message: String },

    #[error("trust service transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("configuration error: {0}")]
    Config(String),
}
