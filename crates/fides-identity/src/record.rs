use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use chrono::{DateTime, Utc};
use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroize;

use fides_crypto::{base64_decode, base64_encode};

use crate::error::KeyError;

/// PBKDF2-HMAC-SHA-256 iteration count for keystore envelopes.
pub const PBKDF2_ITERATIONS: u32 = 600_000;

const SALT_LENGTH: usize = 32;
const IV_LENGTH: usize = 12;
const TAG_LENGTH: usize = 16;

/// A key record as persisted by the on-disk keystore.
///
/// The public key is always stored in the clear; the private seed is either
/// base64 plaintext or an AES-256-GCM envelope, depending on whether the
/// keystore was configured with a passphrase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredKeyRecord {
    pub did: String,
    #[serde(rename = "publicKey")]
    pub public_key: String,
    pub encrypted: bool,
    pub data: KeyMaterial,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Secret-key material inside a record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyMaterial {
    Encrypted(EncryptedEnvelope),
    Plain {
        #[serde(rename = "privateKey")]
        private_key: String,
    },
}

/// AES-256-GCM ciphertext envelope; every field is base64.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedEnvelope {
    pub iv: String,
    pub salt: String,
    #[serde(rename = "authTag")]
    pub auth_tag: String,
    pub ciphertext: String,
}

impl EncryptedEnvelope {
    /// Encrypt a private seed under a passphrase.
    ///
    /// A fresh 32-byte salt and 12-byte IV are drawn per record; the key is
    /// derived with PBKDF2-HMAC-SHA-256 at 600 000 iterations.
    pub fn seal(seed: &[u8], passphrase: &str) -> Result<Self, KeyError> {
        let mut salt = [0u8; SALT_LENGTH];
        OsRng.fill_bytes(&mut salt);
        let mut iv = [0u8; IV_LENGTH];
        OsRng.fill_bytes(&mut iv);

        let mut key = [0u8; 32];
        pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), &salt, PBKDF2_ITERATIONS, &mut key);

        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| KeyError::Encryption(format!("cipher init failed: {e}")))?;
        key.zeroize();

        let sealed = cipher
            .encrypt(Nonce::from_slice(&iv), seed)
            .map_err(|_| KeyError::Encryption("AES-GCM encryption failed".into()))?;

        // aes-gcm appends the 16-byte tag; the record stores it separately.
        let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_LENGTH);

        Ok(Self {
            iv: base64_encode(&iv),
            salt: base64_encode(&salt),
            auth_tag: base64_encode(tag),
            ciphertext: base64_encode(ciphertext),
        })
    }

    /// Decrypt the envelope with a passphrase.
    ///
    /// A wrong passphrase, a truncated field, or any tampering with the
    /// ciphertext or tag surfaces as a `KeyError::Decryption`.
    pub fn open(&self, passphrase: &str) -> Result<Vec<u8>, KeyError> {
        let iv = base64_decode(&self.iv).map_err(|e| KeyError::Decryption(e.to_string()))?;
        let salt = base64_decode(&self.salt).map_err(|e| KeyError::Decryption(e.to_string()))?;
        let tag = base64_decode(&self.auth_tag)
            .map_err(|e| KeyError::Decryption(e.to_string()))?;
        let ciphertext = base64_decode(&self.ciphertext)
            .map_err(|e| KeyError::Decryption(e.to_string()))?;

        if iv.len() != IV_LENGTH {
            return Err(KeyError::Decryption(format!(
                "iv is {} bytes, expected {IV_LENGTH}",
                iv.len()
            )));
        }
        if tag.len() != TAG_LENGTH {
            return Err(KeyError::Decryption(format!(
                "auth tag is {} bytes, expected {TAG_LENGTH}",
                tag.len()
            )));
        }

        let mut key = [0u8; 32];
        pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), &salt, PBKDF2_ITERATIONS, &mut key);

        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| KeyError::Decryption(format!("cipher init failed: {e}")))?;
        key.zeroize();

        let mut sealed = ciphertext;
        sealed.extend_from_slice(&tag);

        cipher
            .decrypt(Nonce::from_slice(&iv), sealed.as_slice())
            .map_err(|_| KeyError::Decryption("wrong passphrase or tampered record".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open_roundtrip() {
        let seed = [42u8; 32];
        let envelope = EncryptedEnvelope::seal(&seed, "hunter2").unwrap();
        let opened = EncryptedEnvelope::open(&envelope, "hunter2").unwrap();
        assert_eq!(opened, seed);
    }

    #[test]
    fn test_wrong_passphrase_fails() {
        let envelope = EncryptedEnvelope::seal(&[1u8; 32], "correct").unwrap();
        let result = envelope.open("incorrect");
        assert!(matches!(result, Err(KeyError::Decryption(_))));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let mut envelope = EncryptedEnvelope::seal(&[7u8; 32], "pass").unwrap();
        let mut bytes = base64_decode(&envelope.ciphertext).unwrap();
        bytes[0] ^= 0xFF;
        envelope.ciphertext = base64_encode(&bytes);
        assert!(envelope.open("pass").is_err());
    }

    #[test]
    fn test_tampered_tag_fails() {
        let mut envelope = EncryptedEnvelope::seal(&[7u8; 32], "pass").unwrap();
        let mut tag = base64_decode(&envelope.auth_tag).unwrap();
        tag[0] ^= 0x01;
        envelope.auth_tag = base64_encode(&tag);
        assert!(envelope.open("pass").is_err());
    }

    #[test]
    fn test_fresh_salt_per_record() {
        let e1 = EncryptedEnvelope::seal(&[9u8; 32], "pass").unwrap();
        let e2 = EncryptedEnvelope::seal(&[9u8; 32], "pass").unwrap();
        assert_ne!(e1.salt, e2.salt);
        assert_ne!(e1.ciphertext, e2.ciphertext);
    }

    #[test]
    fn test_salt_is_32_bytes() {
        let envelope = EncryptedEnvelope::seal(&[0u8; 32], "pass").unwrap();
        assert_eq!(base64_decode(&envelope.salt).unwrap().len(), SALT_LENGTH);
    }

    #[test]
    fn test_record_json_shape() {
        let envelope = EncryptedEnvelope::seal(&[3u8; 32], "pw").unwrap();
        let record = StoredKeyRecord {
            did: "did:fides:abc".into(),
            public_key: base64_encode(&[0u8; 32]),
            encrypted: true,
            data: KeyMaterial::Encrypted(envelope),
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["did"], "did:fides:abc");
        assert!(json["encrypted"].as_bool().unwrap());
        assert!(json["data"]["authTag"].is_string());
        assert!(json["data"]["salt"].is_string());
        assert!(json["createdAt"].is_string());
    }

    #[test]
    fn test_plain_record_json_shape() {
        let record = StoredKeyRecord {
            did: "did:fides:abc".into(),
            public_key: base64_encode(&[0u8; 32]),
            encrypted: false,
            data: KeyMaterial::Plain {
                private_key: base64_encode(&[1u8; 32]),
            },
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert!(json["data"]["privateKey"].is_string());
        let back: StoredKeyRecord = serde_json::from_value(json).unwrap();
        assert!(matches!(back.data, KeyMaterial::Plain { .. }));
    }
}
