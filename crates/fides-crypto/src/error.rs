/// Cryptographic failure modes.
///
/// Length and decoding errors name the offending material without echoing
/// its contents, so error text is safe to log.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// Fixed-size material (keys, seeds, signatures) of the wrong size.
    #[error("{what} must be {expected} bytes, got {actual}")]
    WrongLength {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Bytes of the right size that still do not form a usable key.
    #[error("malformed public key: {0}")]
    MalformedKey(String),

    /// The signature does not verify under the given key.
    #[error("signature verification failed")]
    VerificationFailed,

    /// Text input that is not valid base58, base64 or hex.
    #[error("{encoding} decoding failed: {detail}")]
    Decode {
        encoding: &'static str,
        detail: String,
    },
}

impl CryptoError {
    pub(crate) fn decode(encoding: &'static str, cause: impl std::fmt::Display) -> Self {
        Self::Decode {
            encoding,
            detail: cause.to_string(),
        }
    }
}
