use ed25519_dalek::Signer;
use ed25519_dalek::Verifier;

use crate::codec::hex_decode;
use crate::error::CryptoError;
use crate::keys::{exact, KeyPair, PublicKey};

/// Length of an Ed25519 signature in bytes.
pub const SIGNATURE_LENGTH: usize = 64;

/// A detached Ed25519 signature, stored as its 64 raw bytes.
///
/// Holding plain bytes keeps the type trivially comparable and serializable;
/// the curve arithmetic only happens inside `verify`.
#[derive(Clone, PartialEq, Eq)]
pub struct Signature([u8; SIGNATURE_LENGTH]);

impl Signature {
    /// Wrap raw bytes, rejecting any length other than 64.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        exact("signature", bytes).map(Self)
    }

    /// Decode from a 128-character hex string.
    pub fn from_hex(encoded: &str) -> Result<Self, CryptoError> {
        Self::from_bytes(&hex_decode(encoded)?)
    }

    /// The raw 64 bytes.
    pub fn to_bytes(&self) -> [u8; SIGNATURE_LENGTH] {
        self.0
    }

    /// Encode as hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Signature({})", self.to_hex())
    }
}

/// Sign a message with a key pair.
pub fn sign(message: &[u8], keypair: &KeyPair) -> Signature {
    Signature(keypair.signing_key().sign(message).to_bytes())
}

/// Verify a signature over a message.
///
/// Any 64-byte value is accepted as a candidate; values that are not valid
/// signatures simply fail verification. Attacker-controlled input cannot
/// panic this path.
pub fn verify(
    message: &[u8],
    signature: &Signature,
    public_key: &PublicKey,
) -> Result<(), CryptoError> {
    let candidate = ed25519_dalek::Signature::from_bytes(&signature.0);
    public_key
        .verifying_key()
        .verify(message, &candidate)
        .map_err(|_| CryptoError::VerificationFailed)
}
