use serde::{Deserialize, Serialize};
use std::fmt;

use fides_crypto::{base58_decode, constant_time_str_eq, PublicKey, PUBLIC_KEY_LENGTH};

use crate::error::KeyError;

/// Prefix of every Fides identifier.
pub const DID_PREFIX: &str = "did:fides:";

/// A self-certifying agent identifier of the form `did:fides:<base58(pk)>`.
///
/// The base58 suffix encodes the full 32-byte Ed25519 public key, so parsing
/// an identifier recovers the exact key it was derived from:
/// `Did::parse(Did::from_public_key(pk).as_str()) == pk`.
#[derive(Debug, Clone, Serialize, Deserialize, Hash)]
#[serde(transparent)]
pub struct Did(String);

impl Did {
    /// Derive the identifier for an Ed25519 public key.
    pub fn from_public_key(public_key: &PublicKey) -> Self {
        Self(format!("{}{}", DID_PREFIX, public_key.to_base58()))
    }

    /// Validate and wrap an identifier string.
    pub fn new(value: impl Into<String>) -> Result<Self, KeyError> {
        let value = value.into();
        Self::public_key_of(&value)?;
        Ok(Self(value))
    }

    /// Parse an identifier and recover the public key it certifies.
    pub fn parse(value: &str) -> Result<(Self, PublicKey), KeyError> {
        let pk = Self::public_key_of(value)?;
        Ok((Self(value.to_string()), pk))
    }

    /// Extract the public key from an identifier string.
    ///
    /// Fails when the `did:fides:` prefix is absent, the suffix is not valid
    /// base58, or the decoded key is not exactly 32 bytes.
    pub fn public_key_of(value: &str) -> Result<PublicKey, KeyError> {
        let suffix = value
            .strip_prefix(DID_PREFIX)
            .ok_or_else(|| KeyError::InvalidDid(format!("missing {DID_PREFIX} prefix")))?;
        let bytes = base58_decode(suffix)
            .map_err(|e| KeyError::InvalidDid(format!("invalid base58 suffix: {e}")))?;
        if bytes.len() != PUBLIC_KEY_LENGTH {
            return Err(KeyError::InvalidDid(format!(
                "decoded key is {} bytes, expected {}",
                bytes.len(),
                PUBLIC_KEY_LENGTH
            )));
        }
        PublicKey::from_bytes(&bytes).map_err(KeyError::Crypto)
    }

    /// Boolean validity check that never errors.
    pub fn is_valid(value: &str) -> bool {
        Self::public_key_of(value).is_ok()
    }

    /// Resolve this identifier's public key.
    pub fn public_key(&self) -> Result<PublicKey, KeyError> {
        Self::public_key_of(&self.0)
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for Did {
    fn eq(&self, other: &Self) -> bool {
        // Identifiers are compared in constant time; they appear next to
        // signature material in verification paths.
        constant_time_str_eq(&self.0, &other.0)
    }
}

impl Eq for Did {}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Did {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
