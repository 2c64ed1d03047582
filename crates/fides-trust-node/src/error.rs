use fides_discovery::DiscoveryError;

/// Trust service errors, translated to status codes at the API boundary.
#[derive(Debug, thiserror::Error)]
pub enum TrustError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    SignatureInvalid(String),

    #[error("identity not found — register first: {0}")]
    IdentityNotFound(String),

    #[error("circuit breaker open")]
    CircuitOpen,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("discovery error: {0}")]
    Discovery(#[from] DiscoveryError),
}
