use std::sync::Arc;

use fides_crypto::{
    base64_decode, constant_time_str_eq, verify, PublicKey, Signature, PUBLIC_KEY_LENGTH,
};

use crate::canonical::{signature_base, SignatureParams};
use crate::message::CanonicalRequest;
use crate::replay::NonceStore;
use crate::signer::{content_digest, now_unix};

/// Clock drift tolerated on the expiry side, in seconds.
pub const DEFAULT_CLOCK_DRIFT_SECONDS: u64 = 30;

/// Options recognized when verifying a request.
#[derive(Clone, Default)]
pub struct VerifyOptions {
    /// Replay store; when set, a repeated nonce rejects the request.
    pub nonce_store: Option<Arc<NonceStore>>,
    /// Expiry tolerance in seconds; `None` means the 30-second default.
    pub clock_drift_seconds: Option<u64>,
}

impl VerifyOptions {
    /// Attach a replay store.
    pub fn with_nonce_store(mut self, store: Arc<NonceStore>) -> Self {
        self.nonce_store = Some(store);
        self
    }

    /// Override the clock drift tolerance.
    pub fn with_clock_drift_seconds(mut self, seconds: u64) -> Self {
        self.clock_drift_seconds = Some(seconds);
        self
    }
}

/// Tagged verification result.
///
/// Routine failures are reported here, never by unwinding; callers branch on
/// `valid` without a catch block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationOutcome {
    pub valid: bool,
    pub key_id: Option<String>,
    pub error: Option<String>,
}

impl VerificationOutcome {
    fn ok(key_id: String) -> Self {
        Self {
            valid: true,
            key_id: Some(key_id),
            error: None,
        }
    }

    fn rejected(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            key_id: None,
            error: Some(error.into()),
        }
    }

    fn rejected_for(key_id: &str, error: impl Into<String>) -> Self {
        Self {
            valid: false,
            key_id: Some(key_id.to_string()),
            error: Some(error.into()),
        }
    }
}

/// Verify a signed request against a 32-byte Ed25519 public key.
///
/// Enforces, in order: key length, header presence, `alg` pinning,
/// freshness with clock drift, replay (when a nonce store is configured),
/// the Ed25519 signature over the re-canonicalized base, and the
/// body/`Content-Digest` binding.
pub fn verify_request(
    request: &impl CanonicalRequest,
    public_key: &[u8],
    options: &VerifyOptions,
) -> VerificationOutcome {
    if public_key.len() != PUBLIC_KEY_LENGTH {
        return VerificationOutcome::rejected("invalid public key length");
    }
    let public_key = match PublicKey::from_bytes(public_key) {
        Ok(pk) => pk,
        Err(e) => return VerificationOutcome::rejected(e.to_string()),
    };

    let signature_header = match request.header("signature") {
        Some(v) => v,
        None => return VerificationOutcome::rejected("missing signature"),
    };
    let signature_input = match request.header("signature-input") {
        Some(v) => v,
        None => return VerificationOutcome::rejected("missing signature"),
    };

    let params = match SignatureParams::parse(signature_input) {
        Ok(p) => p,
        Err(e) => return VerificationOutcome::rejected(e.to_string()),
    };
    let key_id = params.key_id.clone();

    // Downgrade defense: only ed25519 signatures are acceptable, whatever
    // the header claims.
    if params.algorithm != "ed25519" {
        return VerificationOutcome::rejected_for(
            &key_id,
            format!("unsupported algorithm \"{}\"", params.algorithm),
        );
    }

    let drift = options
        .clock_drift_seconds
        .unwrap_or(DEFAULT_CLOCK_DRIFT_SECONDS);
    if params.expires.saturating_add(drift) < now_unix() {
        return VerificationOutcome::rejected_for(&key_id, "signature expired");
    }

    if let (Some(store), Some(nonce)) = (&options.nonce_store, &params.nonce) {
        if !store.check(nonce) {
            return VerificationOutcome::rejected_for(&key_id, "replay detected");
        }
    }

    let signature = match extract_signature(signature_header, &params.label) {
        Ok(sig) => sig,
        Err(e) => return VerificationOutcome::rejected_for(&key_id, e),
    };

    let base = match signature_base(request, &params) {
        Ok(b) => b,
        Err(e) => return VerificationOutcome::rejected_for(&key_id, e.to_string()),
    };
    if verify(base.as_bytes(), &signature, &public_key).is_err() {
        return VerificationOutcome::rejected_for(&key_id, "signature verification failed");
    }

    if let (Some(header), Some(body)) = (request.header("content-digest"), request.body()) {
        if !constant_time_str_eq(header, &content_digest(body)) {
            return VerificationOutcome::rejected_for(&key_id, "Content-Digest mismatch");
        }
    }

    VerificationOutcome::ok(key_id)
}

/// Pull the signature bytes out of `<label>=:<base64>:`.
fn extract_signature(header: &str, label: &str) -> Result<Signature, String> {
    let rest = header
        .trim()
        .strip_prefix(label)
        .and_then(|r| r.strip_prefix('='))
        .ok_or_else(|| format!("no signature for label \"{label}\""))?;
    let encoded = rest
        .strip_prefix(':')
        .and_then(|r| r.strip_suffix(':'))
        .ok_or_else(|| "signature must be wrapped in colons".to_string())?;
    let bytes = base64_decode(encoded).map_err(|e| e.to_string())?;
    Signature::from_bytes(&bytes).map_err(|e| e.to_string())
}
