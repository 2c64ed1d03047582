//! Fides Attestation Engine
//!
//! Signed trust statements between agents. The signed payload bytes are
//! authoritative: an attestation only verifies when its envelope fields
//! exactly match the fields recovered from the payload, so a peer cannot
//! sign one statement and present another.

pub mod attestation;
pub mod error;

pub use attestation::{
    create_attestation, verify_attestation, Attestation, AttestationPayload, MAX_TRUST_LEVEL,
};
pub use error::AttestationError;
