//! Fides HTTP Message Signatures
//!
//! RFC 9421-compliant signing and verification of HTTP requests between
//! agents:
//! - Signature base construction and `Signature-Input` parsing
//! - Ed25519 signing with body-digest binding
//! - Verification with freshness, replay and algorithm-downgrade defenses
//! - Bounded nonce store with TTL eviction

pub mod canonical;
pub mod error;
pub mod message;
pub mod replay;
pub mod signer;
pub mod verifier;

pub use canonical::{signature_base, SignatureParams};
pub use error::SignatureError;
pub use message::{CanonicalRequest, HttpMessage};
pub use replay::{NonceStore, DEFAULT_NONCE_TTL, EVICTION_INTERVAL};
pub use signer::{sign_request, SignOptions, DEFAULT_COMPONENTS, DEFAULT_EXPIRY_SECONDS, DEFAULT_LABEL};
pub use verifier::{verify_request, VerificationOutcome, VerifyOptions, DEFAULT_CLOCK_DRIFT_SECONDS};
