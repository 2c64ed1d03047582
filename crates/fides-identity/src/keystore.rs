use chrono::Utc;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use zeroize::Zeroize;

use fides_crypto::{base64_decode, base64_encode, KeyPair};

use crate::did::Did;
use crate::error::KeyError;
use crate::record::{EncryptedEnvelope, KeyMaterial, StoredKeyRecord};

/// Capability set shared by every keystore variant.
pub trait Keystore: Send + Sync {
    /// Persist a key pair under its identifier.
    fn save(&self, did: &Did, keypair: &KeyPair) -> Result<(), KeyError>;

    /// Load the key pair for an identifier.
    fn load(&self, did: &Did) -> Result<KeyPair, KeyError>;
}

/// In-memory keystore for tests and short-lived processes.
#[derive(Default)]
pub struct MemoryKeystore {
    seeds: DashMap<String, [u8; 32]>,
}

impl MemoryKeystore {
    /// Create an empty in-memory keystore.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.seeds.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.seeds.is_empty()
    }
}

impl Keystore for MemoryKeystore {
    fn save(&self, did: &Did, keypair: &KeyPair) -> Result<(), KeyError> {
        check_ownership(did, keypair)?;
        self.seeds
            .insert(did.as_str().to_string(), keypair.secret_bytes());
        Ok(())
    }

    fn load(&self, did: &Did) -> Result<KeyPair, KeyError> {
        let seed = self
            .seeds
            .get(did.as_str())
            .ok_or_else(|| KeyError::NotFound(did.to_string()))?;
        Ok(KeyPair::from_seed(&seed))
    }
}

impl Drop for MemoryKeystore {
    fn drop(&mut self) {
        for mut entry in self.seeds.iter_mut() {
            entry.value_mut().zeroize();
        }
    }
}

/// On-disk keystore: one JSON record per identifier.
///
/// With a passphrase configured, private seeds are stored in an AES-256-GCM
/// envelope; without one, they are stored base64-encoded in the clear.
pub struct FileKeystore {
    dir: PathBuf,
    passphrase: Option<String>,
}

impl FileKeystore {
    /// Open a plaintext keystore rooted at `dir`, creating it if needed.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, KeyError> {
        let store = Self {
            dir: dir.as_ref().to_path_buf(),
            passphrase: None,
        };
        store.ensure_dir()?;
        Ok(store)
    }

    /// Open an encrypting keystore rooted at `dir`.
    pub fn with_passphrase(
        dir: impl AsRef<Path>,
        passphrase: impl Into<String>,
    ) -> Result<Self, KeyError> {
        let store = Self {
            dir: dir.as_ref().to_path_buf(),
            passphrase: Some(passphrase.into()),
        };
        store.ensure_dir()?;
        Ok(store)
    }

    /// Path of the record file for an identifier (colons become hyphens).
    pub fn record_path(&self, did: &Did) -> PathBuf {
        self.dir
            .join(format!("{}.json", did.as_str().replace(':', "-")))
    }

    fn ensure_dir(&self) -> Result<(), KeyError> {
        std::fs::create_dir_all(&self.dir)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.dir, std::fs::Permissions::from_mode(0o700))?;
        }
        Ok(())
    }

    fn write_record(&self, path: &Path, record: &StoredKeyRecord) -> Result<(), KeyError> {
        let json = serde_json::to_string_pretty(record)?;
        std::fs::write(path, json)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }
}

impl Keystore for FileKeystore {
    fn save(&self, did: &Did, keypair: &KeyPair) -> Result<(), KeyError> {
        check_ownership(did, keypair)?;

        let mut seed = keypair.secret_bytes();
        let data = match &self.passphrase {
            Some(pass) => KeyMaterial::Encrypted(EncryptedEnvelope::seal(&seed, pass)?),
            None => KeyMaterial::Plain {
                private_key: base64_encode(&seed),
            },
        };
        seed.zeroize();

        let record = StoredKeyRecord {
            did: did.as_str().to_string(),
            public_key: base64_encode(keypair.public_key().as_bytes()),
            encrypted: self.passphrase.is_some(),
            data,
            created_at: Utc::now(),
        };

        let path = self.record_path(did);
        self.write_record(&path, &record)?;
        tracing::debug!(did = %did, path = %path.display(), "key record written");
        Ok(())
    }

    fn load(&self, did: &Did) -> Result<KeyPair, KeyError> {
        let path = self.record_path(did);
        let contents = std::fs::read_to_string(&path)
            .map_err(|_| KeyError::NotFound(did.to_string()))?;
        let record: StoredKeyRecord = serde_json::from_str(&contents)?;

        if record.did != did.as_str() {
            return Err(KeyError::RecordMismatch {
                requested: did.to_string(),
                found: record.did,
            });
        }

        let mut seed = match (&record.data, &self.passphrase) {
            (KeyMaterial::Encrypted(envelope), Some(pass)) => envelope.open(pass)?,
            (KeyMaterial::Encrypted(_), None) => return Err(KeyError::PassphraseRequired),
            (KeyMaterial::Plain { private_key }, _) => {
                base64_decode(private_key).map_err(KeyError::Crypto)?
            }
        };

        let keypair = KeyPair::from_bytes(&seed)?;
        seed.zeroize();

        // The public key in the record must match the recovered seed.
        check_ownership(did, &keypair)?;
        Ok(keypair)
    }
}

/// Reject a record whose identifier does not certify the key pair in hand.
fn check_ownership(did: &Did, keypair: &KeyPair) -> Result<(), KeyError> {
    let expected = did.public_key()?;
    if expected != keypair.public_key() {
        return Err(KeyError::RecordMismatch {
            requested: did.to_string(),
            found: Did::from_public_key(&keypair.public_key()).to_string(),
        });
    }
    Ok(())
}
