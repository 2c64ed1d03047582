use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroize;

use crate::codec::{base58_decode, hex_decode};
use crate::error::CryptoError;

/// Length of an Ed25519 public key in bytes.
pub const PUBLIC_KEY_LENGTH: usize = 32;

/// Length of an Ed25519 private seed in bytes.
pub const SECRET_KEY_LENGTH: usize = 32;

/// Copy a slice into a fixed array, naming the material on length mismatch.
///
/// Every fixed-size input in this crate (seeds, public keys, signatures)
/// funnels through here, so the length check exists exactly once.
pub(crate) fn exact<const N: usize>(
    what: &'static str,
    bytes: &[u8],
) -> Result<[u8; N], CryptoError> {
    bytes.try_into().map_err(|_| CryptoError::WrongLength {
        what,
        expected: N,
        actual: bytes.len(),
    })
}

/// Ed25519 key pair owned by a single agent.
///
/// All construction paths go through a 32-byte seed; temporary seed copies
/// are wiped before the constructor returns.
pub struct KeyPair {
    secret: SigningKey,
}

impl KeyPair {
    /// Generate a key pair from OS entropy.
    pub fn generate() -> Self {
        let mut seed = [0u8; SECRET_KEY_LENGTH];
        OsRng.fill_bytes(&mut seed);
        let kp = Self::from_seed(&seed);
        seed.zeroize();
        kp
    }

    /// Deterministic construction from a 32-byte seed.
    pub fn from_seed(seed: &[u8; SECRET_KEY_LENGTH]) -> Self {
        Self {
            secret: SigningKey::from_bytes(seed),
        }
    }

    /// Construction from a seed of unchecked length.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let mut seed: [u8; SECRET_KEY_LENGTH] = exact("private seed", bytes)?;
        let kp = Self::from_seed(&seed);
        seed.zeroize();
        Ok(kp)
    }

    /// The public half of this key pair.
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            inner: self.secret.verifying_key(),
        }
    }

    /// The raw private seed. Callers persist it (keystore) and must wipe
    /// their copy afterwards.
    pub fn secret_bytes(&self) -> [u8; SECRET_KEY_LENGTH] {
        self.secret.to_bytes()
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.secret
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Only the public half is printable.
        write!(f, "KeyPair({})", self.public_key().to_hex())
    }
}

/// Ed25519 public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    inner: VerifyingKey,
}

impl PublicKey {
    /// Validate raw bytes as a curve point.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; PUBLIC_KEY_LENGTH] = exact("public key", bytes)?;
        VerifyingKey::from_bytes(&arr)
            .map(|inner| Self { inner })
            .map_err(|e| CryptoError::MalformedKey(e.to_string()))
    }

    /// Decode from a hex string.
    pub fn from_hex(encoded: &str) -> Result<Self, CryptoError> {
        Self::from_bytes(&hex_decode(encoded)?)
    }

    /// Decode from base58 (Bitcoin alphabet).
    pub fn from_base58(encoded: &str) -> Result<Self, CryptoError> {
        Self::from_bytes(&base58_decode(encoded)?)
    }

    /// The raw 32 bytes.
    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        self.inner.as_bytes()
    }

    /// Encode as hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.as_bytes())
    }

    /// Encode as base58 (Bitcoin alphabet).
    pub fn to_base58(&self) -> String {
        bs58::encode(self.as_bytes()).into_string()
    }

    pub(crate) fn verifying_key(&self) -> &VerifyingKey {
        &self.inner
    }
}
