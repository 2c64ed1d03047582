use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use fides_crypto::{base64_encode, sha256, sign, KeyPair};

use crate::canonical::{signature_base, SignatureParams};
use crate::error::SignatureError;
use crate::message::{CanonicalRequest, HttpMessage};

/// Component set signed when the caller does not override it.
pub const DEFAULT_COMPONENTS: [&str; 4] = ["@method", "@target-uri", "@authority", "content-type"];

/// Default signature lifetime in seconds.
pub const DEFAULT_EXPIRY_SECONDS: u64 = 300;

/// Default signature label.
pub const DEFAULT_LABEL: &str = "sig1";

/// Options recognized when signing a request.
#[derive(Debug, Clone)]
pub struct SignOptions {
    /// Key identifier placed in the `keyid` parameter (the signer's DID).
    pub key_id: String,
    /// Ordered component list; defaults to `DEFAULT_COMPONENTS`.
    pub components: Vec<String>,
    /// Seconds until the signature expires; defaults to 300.
    pub expiry_seconds: u64,
    /// Signature label; defaults to `sig1`.
    pub label: String,
}

impl SignOptions {
    /// Options with defaults for everything except the key identifier.
    pub fn new(key_id: impl Into<String>) -> Self {
        Self {
            key_id: key_id.into(),
            components: DEFAULT_COMPONENTS.iter().map(|c| c.to_string()).collect(),
            expiry_seconds: DEFAULT_EXPIRY_SECONDS,
            label: DEFAULT_LABEL.to_string(),
        }
    }

    /// Override the signed component list.
    pub fn with_components(mut self, components: Vec<String>) -> Self {
        self.components = components;
        self
    }

    /// Override the signature lifetime.
    pub fn with_expiry_seconds(mut self, seconds: u64) -> Self {
        self.expiry_seconds = seconds;
        self
    }

    /// Override the label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

/// Sign a request in place.
///
/// Attaches `Content-Digest` when a body is present (and adds
/// `content-digest` to the signed components), then emits the
/// `Signature-Input` and `Signature` headers.
pub fn sign_request(
    request: &mut HttpMessage,
    keypair: &KeyPair,
    options: &SignOptions,
) -> Result<(), SignatureError> {
    if options.expiry_seconds == 0 {
        return Err(SignatureError::InvalidExpiry);
    }

    let created = now_unix();
    let expires = created.saturating_add(options.expiry_seconds);
    let nonce = Uuid::new_v4().to_string();

    let mut components = options.components.clone();
    let digest = request.body().map(content_digest);
    if let Some(digest) = digest {
        request.set_header("Content-Digest", digest);
        if !components.iter().any(|c| c == "content-digest") {
            components.push("content-digest".to_string());
        }
    }

    let params = SignatureParams {
        label: options.label.clone(),
        components,
        created,
        expires,
        nonce: Some(nonce),
        key_id: options.key_id.clone(),
        algorithm: "ed25519".to_string(),
    };

    let base = signature_base(request, &params)?;
    let signature = sign(base.as_bytes(), keypair);

    request.set_header("Signature-Input", params.to_signature_input());
    request.set_header(
        "Signature",
        format!("{}=:{}:", params.label, base64_encode(&signature.to_bytes())),
    );
    Ok(())
}

/// `sha-256=:<base64(sha256(body))>:` as carried in `Content-Digest`.
pub fn content_digest(body: &[u8]) -> String {
    format!("sha-256=:{}:", base64_encode(&sha256(body)))
}

pub(crate) fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
