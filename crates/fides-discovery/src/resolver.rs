use dashmap::DashMap;
use std::time::{Duration, Instant};

use fides_identity::Did;

use crate::client::RegistryClient;
use crate::error::DiscoveryError;

/// How long a positive resolution stays cached.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Where a resolution came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    /// The domain's own `/.well-known/fides.json`.
    WellKnown,
    /// The shared identity registry.
    Registry,
}

/// A resolved identity: the identifier and its hex-encoded public key.
#[derive(Debug, Clone)]
pub struct ResolvedIdentity {
    pub did: String,
    pub public_key: String,
    pub source: ResolutionSource,
}

/// Resolves identifiers or bare domains to public keys.
///
/// Identifiers go straight to the registry. Domains are tried against their
/// self-hosted discovery document first, then the registry's domain index.
/// Positive results are cached in-process for the configured TTL.
pub struct Resolver {
    client: RegistryClient,
    cache: DashMap<String, (ResolvedIdentity, Instant)>,
    ttl: Duration,
}

impl Resolver {
    /// Resolver with the default 5-minute cache TTL.
    pub fn new(client: RegistryClient) -> Self {
        Self::with_cache_ttl(client, DEFAULT_CACHE_TTL)
    }

    /// Resolver with an explicit cache TTL.
    pub fn with_cache_ttl(client: RegistryClient, ttl: Duration) -> Self {
        Self {
            client,
            cache: DashMap::new(),
            ttl,
        }
    }

    /// Resolve an identifier (`did:fides:...`) or a bare domain.
    pub async fn resolve(&self, input: &str) -> Result<ResolvedIdentity, DiscoveryError> {
        if let Some(hit) = self.cached(input) {
            tracing::debug!(input, "resolver cache hit");
            return Ok(hit);
        }

        let resolved = if Did::is_valid(input) {
            let record = self.client.resolve(input).await?;
            ResolvedIdentity {
                did: record.did,
                public_key: record.public_key,
                source: ResolutionSource::Registry,
            }
        } else {
            self.resolve_domain(input).await?
        };

        self.cache
            .insert(input.to_string(), (resolved.clone(), Instant::now()));
        Ok(resolved)
    }

    async fn resolve_domain(&self, domain: &str) -> Result<ResolvedIdentity, DiscoveryError> {
        match self.client.fetch_well_known(domain).await {
            Ok(doc) => Ok(ResolvedIdentity {
                did: doc.did,
                public_key: doc.public_key,
                source: ResolutionSource::WellKnown,
            }),
            Err(e) => {
                tracing::debug!(domain, error = %e, "well-known lookup failed, falling back to registry");
                let records = self.client.list_by_domain(domain).await?;
                let record = records
                    .into_iter()
                    .next()
                    .ok_or_else(|| DiscoveryError::NotFound(domain.to_string()))?;
                Ok(ResolvedIdentity {
                    did: record.did,
                    public_key: record.public_key,
                    source: ResolutionSource::Registry,
                })
            }
        }
    }

    fn cached(&self, input: &str) -> Option<ResolvedIdentity> {
        let entry = self.cache.get(input)?;
        let (resolved, inserted) = entry.value();
        if inserted.elapsed() < self.ttl {
            Some(resolved.clone())
        } else {
            drop(entry);
            self.cache.remove(input);
            None
        }
    }

    /// Number of cached resolutions (expired entries included until touched).
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Drop every cached resolution.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(ttl: Duration) -> Resolver {
        // A loopback port nothing listens on; only the transport-error test
        // actually dials it.
        Resolver::with_cache_ttl(
            RegistryClient::new("http://127.0.0.1:59123").unwrap(),
            ttl,
        )
    }

    fn identity(did: &str) -> ResolvedIdentity {
        ResolvedIdentity {
            did: did.to_string(),
            public_key: "ab".repeat(32),
            source: ResolutionSource::Registry,
        }
    }

    #[test]
    fn test_cache_hit_within_ttl() {
        let r = resolver(Duration::from_secs(60));
        r.cache
            .insert("agent.example".into(), (identity("did:fides:x"), Instant::now()));
        let hit = r.cached("agent.example").unwrap();
        assert_eq!(hit.did, "did:fides:x");
    }

    #[test]
    fn test_cache_expires() {
        let r = resolver(Duration::from_millis(0));
        r.cache
            .insert("agent.example".into(), (identity("did:fides:x"), Instant::now()));
        assert!(r.cached("agent.example").is_none());
        // The stale entry was dropped on the failed lookup.
        assert_eq!(r.cache_len(), 0);
    }

    #[test]
    fn test_clear_cache() {
        let r = resolver(Duration::from_secs(60));
        r.cache
            .insert("a".into(), (identity("did:fides:a"), Instant::now()));
        r.cache
            .insert("b".into(), (identity("did:fides:b"), Instant::now()));
        assert_eq!(r.cache_len(), 2);
        r.clear_cache();
        assert_eq!(r.cache_len(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_registry_is_transport_error() {
        // Nothing listens on this port; the DID path goes straight to the
        // registry and must surface a transport error, not a panic.
        let r = resolver(Duration::from_secs(60));
        let kp = fides_crypto::KeyPair::generate();
        let did = Did::from_public_key(&kp.public_key());
        let err = r.resolve(did.as_str()).await.unwrap_err();
        assert!(matches!(err, DiscoveryError::Transport(_)));
    }
}
