//! Fides Crypto Layer
//!
//! Cryptographic primitives shared by every Fides component:
//! - Ed25519 key pairs and signatures (RFC 8032)
//! - SHA-256 / SHA-512 hashing
//! - base58 / base64 / hex codecs
//! - Constant-time equality for secret material

pub mod codec;
pub mod constant_time;
pub mod error;
pub mod hashing;
pub mod keys;
pub mod signing;

pub use codec::{
    base58_decode, base58_encode, base64_decode, base64_encode, hex_decode, hex_encode,
};
pub use constant_time::{constant_time_eq, constant_time_str_eq};
pub use error::CryptoError;
pub use hashing::{sha256, sha512};
pub use keys::{KeyPair, PublicKey, PUBLIC_KEY_LENGTH, SECRET_KEY_LENGTH};
pub use signing::{sign, verify, Signature, SIGNATURE_LENGTH};
