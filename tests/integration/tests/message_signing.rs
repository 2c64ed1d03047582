//! Integration test: RFC 9421 signing and verification between two agents.
//!
//! The sender derives its identifier, signs requests with the keystore key,
//! and the receiver verifies against the key recovered from the sender's
//! identifier: the full self-certifying loop, including the tamper,
//! digest and replay defenses.

use std::sync::Arc;
use std::time::Duration;

use fides_crypto::KeyPair;
use fides_httpsig::{
    sign_request, verify_request, CanonicalRequest, HttpMessage, NonceStore, SignOptions,
    VerifyOptions,
};
use fides_identity::{Did, MemoryKeystore, Keystore};

fn sender() -> (Did, KeyPair) {
    let kp = KeyPair::generate();
    let did = Did::from_public_key(&kp.public_key());
    (did, kp)
}

fn base_request() -> HttpMessage {
    HttpMessage::new("POST", "https://receiver.example.com/v1/inbox")
        .with_header("Content-Type", "application/json")
        .with_body(b"{\"task\":\"summarize\",\"ref\":42}".to_vec())
}

#[test]
fn test_full_sign_verify_loop_via_identifier() {
    let (did, kp) = sender();
    let store = MemoryKeystore::new();
    store.save(&did, &kp).unwrap();

    // Sender signs with the key loaded from its keystore.
    let mut request = base_request();
    let signing_key = store.load(&did).unwrap();
    sign_request(&mut request, &signing_key, &SignOptions::new(did.as_str())).unwrap();

    // Receiver learns only the identifier and recovers the key from it.
    let outcome = verify_request(
        &request,
        Did::public_key_of(did.as_str()).unwrap().as_bytes(),
        &VerifyOptions::default(),
    );
    assert!(outcome.valid, "{:?}", outcome.error);
    assert_eq!(outcome.key_id.as_deref(), Some(did.as_str()));
}

#[test]
fn test_any_signed_component_mutation_fails() {
    let (did, kp) = sender();
    let mut request = base_request();
    sign_request(&mut request, &kp, &SignOptions::new(did.as_str())).unwrap();
    let key = kp.public_key();

    // Method.
    let mut tampered = request.clone();
    let rebuilt = HttpMessage::new("PUT", "https://receiver.example.com/v1/inbox")
        .with_header("Content-Type", "application/json")
        .with_header("Content-Digest", tampered.header("Content-Digest").unwrap())
        .with_header("Signature-Input", tampered.header("Signature-Input").unwrap())
        .with_header("Signature", tampered.header("Signature").unwrap())
        .with_body(b"{\"task\":\"summarize\",\"ref\":42}".to_vec());
    assert!(!verify_request(&rebuilt, key.as_bytes(), &VerifyOptions::default()).valid);

    // Target URI.
    let rebuilt = HttpMessage::new("POST", "https://attacker.example.com/v1/inbox")
        .with_header("Content-Type", "application/json")
        .with_header("Content-Digest", tampered.header("Content-Digest").unwrap())
        .with_header("Signature-Input", tampered.header("Signature-Input").unwrap())
        .with_header("Signature", tampered.header("Signature").unwrap())
        .with_body(b"{\"task\":\"summarize\",\"ref\":42}".to_vec());
    assert!(!verify_request(&rebuilt, key.as_bytes(), &VerifyOptions::default()).valid);

    // Signed header value.
    tampered.set_header("Content-Type", "text/plain");
    assert!(!verify_request(&tampered, key.as_bytes(), &VerifyOptions::default()).valid);
}

#[test]
fn test_tampered_body_reports_digest_mismatch() {
    let (did, kp) = sender();
    let mut request = HttpMessage::new("POST", "https://receiver.example.com/v1/inbox")
        .with_header("Content-Type", "application/json")
        .with_body(b"{\"x\":1}".to_vec());
    sign_request(&mut request, &kp, &SignOptions::new(did.as_str())).unwrap();

    request.set_body(b"{\"x\":2}".to_vec());
    let outcome = verify_request(
        &request,
        kp.public_key().as_bytes(),
        &VerifyOptions::default(),
    );
    assert!(!outcome.valid);
    assert_eq!(outcome.error.as_deref(), Some("Content-Digest mismatch"));
}

#[tokio::test]
async fn test_replay_rejected_on_second_presentation() {
    let (did, kp) = sender();
    let mut request = base_request();
    sign_request(&mut request, &kp, &SignOptions::new(did.as_str())).unwrap();

    let store = NonceStore::new(Duration::from_secs(300));
    let options = VerifyOptions::default().with_nonce_store(Arc::clone(&store));

    let first = verify_request(&request, kp.public_key().as_bytes(), &options);
    assert!(first.valid, "{:?}", first.error);

    let replayed = verify_request(&request, kp.public_key().as_bytes(), &options);
    assert!(!replayed.valid);
    assert_eq!(replayed.error.as_deref(), Some("replay detected"));

    store.dispose();
}

#[tokio::test]
async fn test_distinct_requests_share_a_nonce_store() {
    let (did, kp) = sender();
    let store = NonceStore::new(Duration::from_secs(300));
    let options = VerifyOptions::default().with_nonce_store(Arc::clone(&store));

    // Two independently signed requests carry fresh nonces; both pass.
    for _ in 0..2 {
        let mut request = base_request();
        sign_request(&mut request, &kp, &SignOptions::new(did.as_str())).unwrap();
        let outcome = verify_request(&request, kp.public_key().as_bytes(), &options);
        assert!(outcome.valid, "{:?}", outcome.error);
    }
    assert_eq!(store.len(), 2);
}

#[test]
fn test_verification_never_panics_on_hostile_headers() {
    let (_, kp) = sender();
    let hostile = [
        ("Signature-Input", "sig1=)broken("),
        ("Signature-Input", "sig1=(\"@method\");created=;expires=1;keyid=\"k\";alg=\"ed25519\""),
        ("Signature", "sig1=::"),
        ("Signature", "=:aaaa:"),
    ];
    for (name, value) in hostile {
        let mut msg = HttpMessage::new("GET", "https://example.com/")
            .with_header("Content-Type", "text/plain")
            .with_header("Signature-Input", "sig1=(\"@method\");created=1;expires=2;keyid=\"k\";alg=\"ed25519\"")
            .with_header("Signature", "sig1=:aGVsbG8=:");
        msg.set_header(name, value);
        let outcome = verify_request(&msg, kp.public_key().as_bytes(), &VerifyOptions::default());
        assert!(!outcome.valid);
        assert!(outcome.error.is_some());
    }
}
