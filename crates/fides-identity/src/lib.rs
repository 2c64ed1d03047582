//! Fides Identity Layer
//!
//! Self-sovereign identity primitives for autonomous agents:
//! - `did:fides` self-certifying identifiers derived from Ed25519 keys
//! - In-memory and on-disk keystores
//! - Password-based encryption of private seeds (AES-256-GCM, PBKDF2)

pub mod did;
pub mod error;
pub mod keystore;
pub mod record;

pub use did::{Did, DID_PREFIX};
pub use error::KeyError;
pub use keystore::{FileKeystore, Keystore, MemoryKeystore};
pub use record::{EncryptedEnvelope, KeyMaterial, StoredKeyRecord, PBKDF2_ITERATIONS};
