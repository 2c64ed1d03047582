use std::sync::atomic::{AtomicBool, Ordering};

use fides_discovery::DiscoveryDocument;

use crate::config::RegistryConfig;
use crate::store::IdentityStore;

/// Shared state for all registry handlers.
pub struct AppState {
    pub store: IdentityStore,
    pub config: RegistryConfig,
    /// The service's own discovery document, served at
    /// `/.well-known/fides.json`.
    pub document: DiscoveryDocument,
    shutting_down: AtomicBool,
}

impl AppState {
    pub fn new(
        store: IdentityStore,
        config: RegistryConfig,
        document: DiscoveryDocument,
    ) -> Self {
        Self {
            store,
            config,
            document,
            shutting_down: AtomicBool::new(false),
        }
    }

    /// Flip the drain flag; new requests are rejected from here on.
    pub fn begin_shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
    }

    /// Whether the service is draining.
    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }
}
