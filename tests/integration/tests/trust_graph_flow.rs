//! Integration test: attestation issuance feeding the trust graph.
//!
//! Agents mint identities, attest to each other, and the resulting edges
//! answer path and reputation queries with the documented constants.

use chrono::{Duration, Utc};

use fides_attestation::{create_attestation, verify_attestation, AttestationPayload};
use fides_crypto::KeyPair;
use fides_identity::Did;
use fides_trust::{find_path, reputation, EdgeStatus, TrustEdge};

struct Party {
    did: Did,
    keypair: KeyPair,
}

fn party() -> Party {
    let keypair = KeyPair::generate();
    let did = Did::from_public_key(&keypair.public_key());
    Party { did, keypair }
}

/// Build a trust edge from a real signed attestation, the way the trust
/// service persists one after verification.
fn edge_from_attestation(id: i64, issuer: &Party, subject: &Party, level: i64) -> TrustEdge {
    let att =
        create_attestation(issuer.did.as_str(), subject.did.as_str(), level, &issuer.keypair)
            .unwrap();
    assert!(verify_attestation(&att, &issuer.keypair.public_key()));

    TrustEdge {
        id,
        source: att.issuer_did.clone(),
        target: att.subject_did.clone(),
        level: att.trust_level,
        attestation_id: att.id.clone(),
        signature: att.signature.clone(),
        payload: att.payload.clone(),
        created_at: Utc::now(),
        expires_at: None,
        revoked_at: None,
    }
}

#[test]
fn test_attested_direct_path() {
    let a = party();
    let b = party();
    let edges = vec![edge_from_attestation(1, &a, &b, 80)];

    let result = find_path(&edges, a.did.as_str(), b.did.as_str());
    assert!(result.found);
    assert_eq!(result.hops, 1);
    assert!((result.cumulative_trust - 0.8).abs() < 1e-9);
}

#[test]
fn test_attested_chain_with_decay() {
    let a = party();
    let b = party();
    let c = party();
    let d = party();
    let edges = vec![
        edge_from_attestation(1, &a, &b, 100),
        edge_from_attestation(2, &b, &c, 100),
        edge_from_attestation(3, &c, &d, 100),
    ];

    let two_hop = find_path(&edges, a.did.as_str(), c.did.as_str());
    assert_eq!(two_hop.hops, 2);
    assert!((two_hop.cumulative_trust - 0.85).abs() < 1e-9);

    let three_hop = find_path(&edges, a.did.as_str(), d.did.as_str());
    assert_eq!(three_hop.hops, 3);
    assert!((three_hop.cumulative_trust - 0.614125).abs() < 1e-9);
}

#[test]
fn test_attestation_cycle_does_not_loop() {
    let a = party();
    let b = party();
    let c = party();
    let edges = vec![
        edge_from_attestation(1, &a, &b, 80),
        edge_from_attestation(2, &b, &c, 90),
        edge_from_attestation(3, &c, &a, 70),
    ];

    let result = find_path(&edges, a.did.as_str(), c.did.as_str());
    assert!(result.found);
    assert_eq!(result.hops, 2);
}

#[test]
fn test_revocation_removes_edge_from_queries() {
    let a = party();
    let b = party();
    let mut edge = edge_from_attestation(1, &a, &b, 80);
    edge.revoked_at = Some(Utc::now());
    assert_eq!(edge.status(Utc::now()), EdgeStatus::Revoked);

    let edges = vec![edge];
    assert!(!find_path(&edges, a.did.as_str(), b.did.as_str()).found);
    let score = reputation(&edges, b.did.as_str());
    assert_eq!(score.direct_trusters, 0);
    assert_eq!(score.score, 0.0);
}

#[test]
fn test_expiry_removes_edge_from_queries() {
    let a = party();
    let b = party();
    let mut edge = edge_from_attestation(1, &a, &b, 80);
    edge.expires_at = Some(Utc::now() - Duration::minutes(1));

    let edges = vec![edge];
    assert!(!find_path(&edges, a.did.as_str(), b.did.as_str()).found);
}

#[test]
fn test_reputation_combines_direct_and_transitive() {
    let a = party();
    let b = party();
    let s = party();
    // B trusts S directly; A trusts B, so A is a hop-2 transitive truster.
    let edges = vec![
        edge_from_attestation(1, &b, &s, 100),
        edge_from_attestation(2, &a, &b, 100),
    ];

    let score = reputation(&edges, s.did.as_str());
    assert_eq!(score.direct_trusters, 1);
    assert_eq!(score.transitive_trusters, 1);
    let expected = (0.7 * 1.0 + 0.3 * 0.85_f64).min(1.0);
    assert!((score.score - expected).abs() < 1e-9);
}

#[test]
fn test_semantic_binding_between_payload_and_edge() {
    // The payload stored on the edge re-parses to exactly the envelope the
    // service validated, the binding the create-trust protocol enforces.
    let a = party();
    let b = party();
    let edge = edge_from_attestation(1, &a, &b, 64);

    let payload: AttestationPayload = serde_json::from_str(&edge.payload).unwrap();
    assert_eq!(payload.issuer_did, edge.source);
    assert_eq!(payload.subject_did, edge.target);
    assert_eq!(payload.trust_level, edge.level);
    assert_eq!(payload.id, edge.attestation_id);
}

#[test]
fn test_tampered_attestation_would_not_produce_edge() {
    let a = party();
    let b = party();
    let mut att =
        create_attestation(a.did.as_str(), b.did.as_str(), 55, &a.keypair).unwrap();

    // Raising the level after signing is exactly what verification blocks.
    att.trust_level = 100;
    assert!(!verify_attestation(&att, &a.keypair.public_key()));
}
