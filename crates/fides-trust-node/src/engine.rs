//! The create-trust protocol and score/path queries.

use chrono::{Duration, Utc};

use fides_attestation::AttestationPayload;
use fides_crypto::{hex_decode, verify, PublicKey, Signature, SIGNATURE_LENGTH};
use fides_discovery::{DiscoveryError, IdentityRecord, RegistryClient};
use fides_identity::Did;
use fides_trust::{
    find_path, reputation, CreateTrustRequest, CreateTrustResponse, PathResult,
    TrustScoreResponse,
};

use crate::breaker::CircuitBreaker;
use crate::error::TrustError;
use crate::identity_cache::KnownIdentityCache;
use crate::store::TrustStore;

/// Cached reputation rows are honored for one hour.
pub const SCORE_CACHE_SECONDS: i64 = 3600;

/// Coordinates validation, identity materialization, verification and
/// persistence for the trust graph service.
pub struct TrustEngine {
    store: TrustStore,
    registry: RegistryClient,
    breaker: CircuitBreaker,
    known: KnownIdentityCache,
}

impl TrustEngine {
    pub fn new(store: TrustStore, registry: RegistryClient) -> Self {
        Self {
            store,
            registry,
            breaker: CircuitBreaker::new(),
            known: KnownIdentityCache::new(),
        }
    }

    /// Persist a submitted attestation as a trust edge.
    pub async fn create_trust(
        &self,
        request: &CreateTrustRequest,
    ) -> Result<CreateTrustResponse, TrustError> {
        // Syntactic validation.
        let level = request
            .trust_level
            .as_i64()
            .ok_or_else(|| TrustError::Validation("trustLevel must be an integer".into()))?;
        if !(0..=100).contains(&level) {
            return Err(TrustError::Validation(
                "trustLevel must be between 0 and 100".into(),
            ));
        }
        let level = level as u8;

        Did::public_key_of(&request.issuer_did)
            .map_err(|e| TrustError::Validation(format!("invalid issuerDid: {e}")))?;
        Did::public_key_of(&request.subject_did)
            .map_err(|e| TrustError::Validation(format!("invalid subjectDid: {e}")))?;

        let sig_bytes = hex_decode(&request.signature)
            .map_err(|e| TrustError::Validation(format!("signature is not hex: {e}")))?;
        if sig_bytes.len() != SIGNATURE_LENGTH {
            return Err(TrustError::Validation(format!(
                "signature must be {SIGNATURE_LENGTH} bytes"
            )));
        }
        let signature = Signature::from_bytes(&sig_bytes)
            .map_err(|e| TrustError::Validation(e.to_string()))?;

        // Materialize both endpoints, in parallel.
        tokio::try_join!(
            self.materialize(&request.issuer_did),
            self.materialize(&request.subject_did)
        )?;

        // Cryptographic verification under the issuer's registered key.
        let issuer = self
            .store
            .get_identity(&request.issuer_did)
            .await?
            .ok_or_else(|| TrustError::IdentityNotFound(request.issuer_did.clone()))?;
        let issuer_key = PublicKey::from_bytes(
            &hex_decode(&issuer.public_key)
                .map_err(|e| TrustError::SignatureInvalid(e.to_string()))?,
        )
        .map_err(|e| TrustError::SignatureInvalid(e.to_string()))?;
        verify(request.payload.as_bytes(), &signature, &issuer_key)
            .map_err(|_| TrustError::SignatureInvalid("signature verification failed".into()))?;

        // Semantic binding: the signed payload must say what the request says.
        let payload: AttestationPayload = serde_json::from_str(&request.payload)
            .map_err(|e| TrustError::Validation(format!("payload is not valid JSON: {e}")))?;
        if payload.issuer_did != request.issuer_did
            || payload.subject_did != request.subject_did
            || payload.trust_level != level
        {
            return Err(TrustError::Validation(
                "payload does not match request fields".into(),
            ));
        }

        let id = self
            .store
            .upsert_edge(
                &request.issuer_did,
                &request.subject_did,
                level,
                &payload.id,
                &request.signature,
                &request.payload,
                request.expires_at,
            )
            .await?;
        self.store.invalidate_score(&request.subject_did).await?;

        tracing::info!(
            edge = id,
            issuer = %request.issuer_did,
            subject = %request.subject_did,
            level,
            "trust edge upserted"
        );

        Ok(CreateTrustResponse {
            id,
            issuer_did: request.issuer_did.clone(),
            subject_did: request.subject_did.clone(),
            trust_level: level,
        })
    }

    /// Ensure an identifier has a local identity row, resolving it from the
    /// registry (behind the circuit breaker) when unknown.
    async fn materialize(&self, did: &str) -> Result<(), TrustError> {
        if self.known.contains(did) {
            return Ok(());
        }
        if let Some(record) = self.store.get_identity(did).await? {
            // Trust operations refresh last_seen on the identities they touch.
            self.store
                .upsert_identity(&record.did, &record.public_key, &record.metadata)
                .await?;
            self.known.mark(did);
            return Ok(());
        }

        self.breaker.try_acquire()?;
        match self.registry.resolve(did).await {
            Ok(record) => {
                self.breaker.record_success();
                self.store
                    .upsert_identity(&record.did, &record.public_key, &record.metadata)
                    .await?;
                self.known.mark(did);
                Ok(())
            }
            Err(DiscoveryError::NotFound(_)) => {
                // The registry answered; the identity simply does not exist.
                self.breaker.record_success();
                Err(TrustError::IdentityNotFound(did.to_string()))
            }
            Err(e) => {
                self.breaker.record_failure();
                tracing::warn!(did, error = %e, "registry fetch failed");
                Err(TrustError::IdentityNotFound(did.to_string()))
            }
        }
    }

    /// Cached-or-recomputed reputation score for a subject.
    pub async fn get_score(&self, did: &str) -> Result<TrustScoreResponse, TrustError> {
        let now = Utc::now();
        if let Some((cached, last_computed)) = self.store.get_cached_score(did).await? {
            if now.signed_duration_since(last_computed) < Duration::seconds(SCORE_CACHE_SECONDS) {
                tracing::debug!(did, "reputation cache hit");
                return Ok(TrustScoreResponse {
                    did: did.to_string(),
                    score: cached.score,
                    direct_trusters: cached.direct_trusters,
                    transitive_trusters: cached.transitive_trusters,
                    last_computed,
                });
            }
        }

        let edges = self.store.load_edges().await?;
        let score = reputation(&edges, did);
        self.store.upsert_score(did, &score, now).await?;
        tracing::debug!(did, score = score.score, "reputation recomputed");

        Ok(TrustScoreResponse {
            did: did.to_string(),
            score: score.score,
            direct_trusters: score.direct_trusters,
            transitive_trusters: score.transitive_trusters,
            last_computed: now,
        })
    }

    /// Shortest trust path between two identifiers.
    pub async fn path(&self, from: &str, to: &str) -> Result<PathResult, TrustError> {
        let edges = self.store.load_edges().await?;
        Ok(find_path(&edges, from, to))
    }

    /// The service's local view of an identity.
    pub async fn identity(&self, did: &str) -> Result<Option<IdentityRecord>, TrustError> {
        Ok(self.store.get_identity(did).await?)
    }

    /// Drop in-process caches (shutdown path).
    pub fn reset_caches(&self) {
        self.known.clear();
    }

    /// Database liveness, for the health endpoint.
    pub async fn ping(&self) -> bool {
        self.store.ping().await
    }
}
