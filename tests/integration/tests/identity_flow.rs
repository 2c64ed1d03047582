//! Integration test: identity lifecycle across the crypto and identity layers.
//!
//! Mint a keypair, derive its self-certifying identifier, persist it through
//! both keystore variants, and sign with the reloaded key.

use fides_crypto::{sign, verify, KeyPair, PublicKey};
use fides_identity::{Did, FileKeystore, Keystore, MemoryKeystore};

// =========================================================================
// Identifier self-certification
// =========================================================================

#[test]
fn test_identifier_recovers_exact_public_key() {
    for _ in 0..16 {
        let kp = KeyPair::generate();
        let did = Did::from_public_key(&kp.public_key());
        let (_, recovered) = Did::parse(did.as_str()).unwrap();
        assert_eq!(recovered, kp.public_key());
        assert_eq!(recovered.as_bytes(), kp.public_key().as_bytes());
    }
}

#[test]
fn test_identifier_rejects_foreign_material() {
    assert!(Did::parse("did:fides:").is_err());
    assert!(Did::parse("did:other:abc").is_err());
    // A 64-byte blob is not a valid key even if it is valid base58.
    let too_long = fides_crypto::base58_encode(&[7u8; 64]);
    assert!(Did::parse(&format!("did:fides:{too_long}")).is_err());
}

// =========================================================================
// Keystore round-trips feeding real signing operations
// =========================================================================

#[test]
fn test_memory_keystore_reloaded_key_signs() {
    let store = MemoryKeystore::new();
    let kp = KeyPair::generate();
    let did = Did::from_public_key(&kp.public_key());
    store.save(&did, &kp).unwrap();

    let reloaded = store.load(&did).unwrap();
    let sig = sign(b"inter-agent message", &reloaded);
    assert!(verify(b"inter-agent message", &sig, &kp.public_key()).is_ok());
}

#[test]
fn test_encrypted_file_keystore_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileKeystore::with_passphrase(dir.path(), "correct horse battery").unwrap();

    let kp = KeyPair::generate();
    let did = Did::from_public_key(&kp.public_key());
    store.save(&did, &kp).unwrap();

    // A fresh store instance with the same passphrase recovers the seed.
    let store2 = FileKeystore::with_passphrase(dir.path(), "correct horse battery").unwrap();
    let reloaded = store2.load(&did).unwrap();
    assert_eq!(reloaded.secret_bytes(), kp.secret_bytes());

    // The reloaded key signs messages the original public key verifies.
    let sig = sign(b"signed after reload", &reloaded);
    assert!(verify(b"signed after reload", &sig, &kp.public_key()).is_ok());

    // The wrong passphrase recovers nothing.
    let wrong = FileKeystore::with_passphrase(dir.path(), "incorrect").unwrap();
    assert!(wrong.load(&did).is_err());
}

#[test]
fn test_plaintext_record_readable_by_fresh_store() {
    let dir = tempfile::tempdir().unwrap();
    let kp = KeyPair::generate();
    let did = Did::from_public_key(&kp.public_key());
    FileKeystore::new(dir.path()).unwrap().save(&did, &kp).unwrap();

    let reloaded = FileKeystore::new(dir.path()).unwrap().load(&did).unwrap();
    assert_eq!(reloaded.public_key(), kp.public_key());
}

// =========================================================================
// Registration-style hijack check, as the registry performs it
// =========================================================================

#[test]
fn test_registration_key_binding() {
    let kp = KeyPair::generate();
    let did = Did::from_public_key(&kp.public_key());

    // Honest submission: the DID suffix decodes to the submitted key.
    let did_key = Did::public_key_of(did.as_str()).unwrap();
    let submitted = fides_crypto::hex_decode(&kp.public_key().to_hex()).unwrap();
    assert!(fides_crypto::constant_time_eq(did_key.as_bytes(), &submitted));

    // Hijack attempt: someone else's key under this DID must not bind.
    let attacker = KeyPair::generate();
    let attacker_bytes = attacker.public_key().as_bytes().to_vec();
    assert!(!fides_crypto::constant_time_eq(
        did_key.as_bytes(),
        &attacker_bytes
    ));

    // And the attacker's key round-trips to a different identifier entirely.
    let attacker_did = Did::from_public_key(&PublicKey::from_bytes(&attacker_bytes).unwrap());
    assert_ne!(attacker_did, did);
}
