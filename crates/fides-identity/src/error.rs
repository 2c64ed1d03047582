use fides_crypto::CryptoError;

/// Key management and identifier errors.
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("invalid identifier: {0}")]
    InvalidDid(String),

    #[error("key not found for {0}")]
    NotFound(String),

    #[error("stored record belongs to {found}, not {requested}")]
    RecordMismatch { requested: String, found: String },

    #[error("record is encrypted but no passphrase is configured")]
    PassphraseRequired,

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("keystore I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("keystore record malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}
