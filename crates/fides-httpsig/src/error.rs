use fides_crypto::CryptoError;

/// Errors raised while building or parsing signature material.
///
/// Routine verification failures are not errors; `verify_request` reports
/// them as a `VerificationOutcome` value so callers can branch without
/// unwinding.
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("signed header \"{0}\" is missing from the request")]
    MissingComponent(String),

    #[error("unknown derived component \"{0}\"")]
    UnknownDerivedComponent(String),

    #[error("request target is not a valid URI: {0}")]
    InvalidTargetUri(String),

    #[error("malformed Signature-Input: {0}")]
    MalformedSignatureInput(String),

    #[error("malformed Signature header: {0}")]
    MalformedSignature(String),

    #[error("signature expiry must be a positive number of seconds")]
    InvalidExpiry,

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
}
