use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::TrustConfig;
use crate::engine::TrustEngine;

/// Shared state for all trust service handlers.
pub struct AppState {
    pub engine: TrustEngine,
    pub config: TrustConfig,
    shutting_down: AtomicBool,
}

impl AppState {
    pub fn new(engine: TrustEngine, config: TrustConfig) -> Self {
        Self {
            engine,
            config,
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
