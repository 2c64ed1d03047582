use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use fides_crypto::{constant_time_str_eq, hex_decode, sign, verify, KeyPair, PublicKey, Signature};
use fides_identity::Did;

use crate::error::AttestationError;

/// Upper bound of the trust scale.
pub const MAX_TRUST_LEVEL: u8 = 100;

/// A signed trust statement from an issuer to a subject.
///
/// `payload` holds the exact JSON string that was signed; it is stored and
/// re-verified byte for byte. The remaining fields are an envelope for
/// indexing and display and must agree with the payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attestation {
    pub id: String,
    #[serde(rename = "issuerDid")]
    pub issuer_did: String,
    #[serde(rename = "subjectDid")]
    pub subject_did: String,
    #[serde(rename = "trustLevel")]
    pub trust_level: u8,
    #[serde(rename = "issuedAt")]
    pub issued_at: String,
    #[serde(rename = "expiresAt", skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    /// Hex-encoded 64-byte Ed25519 signature over `payload`.
    pub signature: String,
    /// The exact payload string that was signed.
    pub payload: String,
}

/// The signed portion of an attestation.
///
/// Field order is the serialization order; the payload string an issuer
/// produces is the one every verifier re-checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttestationPayload {
    pub id: String,
    #[serde(rename = "issuerDid")]
    pub issuer_did: String,
    #[serde(rename = "subjectDid")]
    pub subject_did: String,
    #[serde(rename = "trustLevel")]
    pub trust_level: u8,
    #[serde(rename = "issuedAt")]
    pub issued_at: String,
}

/// Create and sign a trust attestation.
///
/// Both identifiers must be well-formed `did:fides` strings and the level an
/// integer in `0..=100`.
pub fn create_attestation(
    issuer_did: &str,
    subject_did: &str,
    trust_level: i64,
    keypair: &KeyPair,
) -> Result<Attestation, AttestationError> {
    if !Did::is_valid(issuer_did) {
        return Err(AttestationError::InvalidIssuer(issuer_did.to_string()));
    }
    if !Did::is_valid(subject_did) {
        return Err(AttestationError::InvalidSubject(subject_did.to_string()));
    }
    if !(0..=MAX_TRUST_LEVEL as i64).contains(&trust_level) {
        return Err(AttestationError::TrustLevelOutOfRange(trust_level));
    }
    let trust_level = trust_level as u8;

    let payload = AttestationPayload {
        id: Uuid::new_v4().to_string(),
        issuer_did: issuer_did.to_string(),
        subject_did: subject_did.to_string(),
        trust_level,
        issued_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    };
    let payload_json = serde_json::to_string(&payload)?;
    let signature = sign(payload_json.as_bytes(), keypair);

    Ok(Attestation {
        id: payload.id,
        issuer_did: payload.issuer_did,
        subject_did: payload.subject_did,
        trust_level,
        issued_at: payload.issued_at,
        expires_at: None,
        signature: signature.to_hex(),
        payload: payload_json,
    })
}

/// Verify an attestation against the issuer's public key.
///
/// Checks the Ed25519 signature over the exact payload bytes, then requires
/// every envelope field to equal its payload counterpart (string fields in
/// constant time). Any failure yields `false`; this function never panics on
/// malformed input.
pub fn verify_attestation(attestation: &Attestation, issuer_key: &PublicKey) -> bool {
    let sig_bytes = match hex_decode(&attestation.signature) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };
    let signature = match Signature::from_bytes(&sig_bytes) {
        Ok(sig) => sig,
        Err(_) => return false,
    };
    if verify(attestation.payload.as_bytes(), &signature, issuer_key).is_err() {
        return false;
    }

    let payload: AttestationPayload = match serde_json::from_str(&attestation.payload) {
        Ok(p) => p,
        Err(_) => return false,
    };

    constant_time_str_eq(&payload.id, &attestation.id)
        && constant_time_str_eq(&payload.issuer_did, &attestation.issuer_did)
        && constant_time_str_eq(&payload.subject_did, &attestation.subject_did)
        && payload.trust_level == attestation.trust_level
        && constant_time_str_eq(&payload.issued_at, &attestation.issued_at)
}
