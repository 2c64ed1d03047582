use dashmap::DashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Default nonce lifetime.
pub const DEFAULT_NONCE_TTL: Duration = Duration::from_secs(300);

/// How often expired nonces are swept.
pub const EVICTION_INTERVAL: Duration = Duration::from_secs(60);

/// Bounded set of recently seen signature nonces.
///
/// `check` is atomic insert-if-absent, so two concurrent verifications of
/// the same nonce cannot both pass. A background task sweeps entries older
/// than the TTL; `dispose` cancels it and clears the set.
pub struct NonceStore {
    seen: DashMap<String, Instant>,
    ttl: Duration,
    eviction: Mutex<Option<JoinHandle<()>>>,
}

impl NonceStore {
    /// Create a store and start its eviction task.
    ///
    /// Must be called from within a tokio runtime. The task holds only a
    /// weak reference, so dropping the store stops the sweep.
    pub fn new(ttl: Duration) -> Arc<Self> {
        let store = Arc::new(Self {
            seen: DashMap::new(),
            ttl,
            eviction: Mutex::new(None),
        });
        let weak: Weak<Self> = Arc::downgrade(&store);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(EVICTION_INTERVAL);
            interval.tick().await;
            loop {
                interval.tick().await;
                match weak.upgrade() {
                    Some(store) => store.evict_expired(),
                    None => break,
                }
            }
        });
        *store.eviction.lock().expect("eviction handle lock") = Some(handle);
        store
    }

    /// Create a store with the 300-second default TTL.
    pub fn with_default_ttl() -> Arc<Self> {
        Self::new(DEFAULT_NONCE_TTL)
    }

    /// Record a nonce. Returns `false` when the nonce was already seen
    /// (a replay), `true` when it is fresh and has now been recorded.
    pub fn check(&self, nonce: &str) -> bool {
        let mut fresh = false;
        self.seen.entry(nonce.to_string()).or_insert_with(|| {
            fresh = true;
            Instant::now()
        });
        fresh
    }

    /// Drop entries older than the TTL.
    pub fn evict_expired(&self) {
        let ttl = self.ttl;
        let before = self.seen.len();
        self.seen.retain(|_, inserted| inserted.elapsed() < ttl);
        let evicted = before.saturating_sub(self.seen.len());
        if evicted > 0 {
            tracing::debug!(evicted, remaining = self.seen.len(), "evicted stale nonces");
        }
    }

    /// Number of nonces currently tracked.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Clear the set and cancel the eviction task.
    pub fn dispose(&self) {
        if let Some(handle) = self.eviction.lock().expect("eviction handle lock").take() {
            handle.abort();
        }
        self.seen.clear();
    }
}

impl Drop for NonceStore {
    fn drop(&mut self) {
        if let Some(handle) = self.eviction.lock().expect("eviction handle lock").take() {
            handle.abort();
        }
    }
}
