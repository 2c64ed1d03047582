//! In-memory "identity is known locally" markers.

use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Default lifetime of a known-identity marker.
pub const KNOWN_IDENTITY_TTL: Duration = Duration::from_secs(30 * 60);

/// Remembers which identifiers already have a local identity row, so the
/// create-trust path skips redundant database lookups for half an hour.
pub struct KnownIdentityCache {
    entries: DashMap<String, Instant>,
    ttl: Duration,
}

impl KnownIdentityCache {
    pub fn new() -> Self {
        Self::with_ttl(KNOWN_IDENTITY_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Mark an identifier as locally known.
    pub fn mark(&self, did: &str) {
        self.entries.insert(did.to_string(), Instant::now());
    }

    /// Whether a fresh marker exists. Stale markers are dropped on access.
    pub fn contains(&self, did: &str) -> bool {
        let fresh = match self.entries.get(did) {
            Some(entry) => entry.elapsed() < self.ttl,
            None => return false,
        };
        if !fresh {
            self.entries.remove(did);
        }
        fresh
    }

    /// Drop every marker (shutdown/reset path).
    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for KnownIdentityCache {
    fn default() -> Self {
        Self::new()
    }
}
