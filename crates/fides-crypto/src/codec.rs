use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::CryptoError;

/// Encode bytes as base58 (Bitcoin alphabet).
pub fn base58_encode(data: &[u8]) -> String {
    bs58::encode(data).into_string()
}

/// Decode a base58 (Bitcoin alphabet) string.
pub fn base58_decode(encoded: &str) -> Result<Vec<u8>, CryptoError> {
    bs58::decode(encoded)
        .into_vec()
        .map_err(|e| CryptoError::decode("base58", e))
}

/// Encode bytes as standard base64 with padding.
pub fn base64_encode(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decode a standard base64 string.
pub fn base64_decode(encoded: &str) -> Result<Vec<u8>, CryptoError> {
    STANDARD
        .decode(encoded)
        .map_err(|e| CryptoError::decode("base64", e))
}

/// Encode bytes as lowercase hex.
pub fn hex_encode(data: &[u8]) -> String {
    hex::encode(data)
}

/// Decode a hex string.
pub fn hex_decode(encoded: &str) -> Result<Vec<u8>, CryptoError> {
    hex::decode(encoded).map_err(|e| CryptoError::decode("hex", e))
}
